// ==========================================
// 销售订单排产系统 - 产能管理器
// ==========================================
// 职责: 推导 (机台, 日期) 的可用产能
// 红线: 已承诺产能永远从排产明细实时聚合,不维护独立计数器
//       (避免双数据源漂移; 增删明细后无需任何补偿更新)
// ==========================================

use crate::domain::machine::Machine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::plan_entry_repo::PlanEntryRepository;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// CapacityManager - 产能管理器
// ==========================================
pub struct CapacityManager {
    conn: Arc<Mutex<Connection>>,
}

impl CapacityManager {
    /// 构造函数
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 可用产能 = capacity_per_day - committed(machine, date)
    ///
    /// 停用机台定义为 0; 负差值收敛为 0
    pub fn available_capacity(&self, machine: &Machine, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::available_capacity_on(&conn, machine, date)
    }

    /// (machine, date) 已承诺数量
    pub fn committed(&self, machine_id: i64, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        PlanEntryRepository::committed_on(&conn, machine_id, date)
    }

    // ==========================================
    // 事务内关联函数（排产引擎在单事务中调用）
    // ==========================================

    /// 可用产能（事务内可用）
    pub fn available_capacity_on(
        conn: &Connection,
        machine: &Machine,
        date: NaiveDate,
    ) -> RepositoryResult<i64> {
        if !machine.is_active {
            return Ok(0);
        }
        let committed = PlanEntryRepository::committed_on(conn, machine.id, date)?;
        Ok((machine.capacity_per_day - committed).max(0))
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::machine_repo::MachineRepository;
    use chrono::Utc;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_available_capacity_is_derived_from_entries() {
        let conn = setup();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let machine = {
            let guard = conn.lock().unwrap();
            let m = MachineRepository::insert_on(&guard, "Line A", 100).unwrap();
            guard
                .execute(
                    "INSERT INTO consolidated_batch (product_name, color, total_quantity, remaining_quantity, order_nos, created_at) VALUES ('Chair','Red',60,60,'O1','2024-06-01 00:00:00')",
                    [],
                )
                .unwrap();
            PlanEntryRepository::insert_on(&guard, date, 1, 60, m.id).unwrap();
            m
        };

        let manager = CapacityManager::new(conn.clone());
        assert_eq!(manager.available_capacity(&machine, date).unwrap(), 40);

        // 其他日期不受影响
        let other = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(manager.available_capacity(&machine, other).unwrap(), 100);
    }

    #[test]
    fn test_inactive_machine_has_zero_capacity() {
        let conn = setup();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let machine = Machine {
            id: 99,
            name: "Stopped".to_string(),
            capacity_per_day: 500,
            is_active: false,
            created_at: Utc::now().naive_utc(),
        };

        let manager = CapacityManager::new(conn);
        assert_eq!(manager.available_capacity(&machine, date).unwrap(), 0);
    }
}
