// ==========================================
// 销售订单排产系统 - 排产引擎
// ==========================================
// 职责: 将批次余量按交期优先级分配到 (日期, 机台)
// 红线: 产能约束优先于批次优先级; 任意 (机台, 日) 排入量不得超过日产能
// 红线: 贪心逐日填充,不回溯、不做全局最优
// ==========================================
// 输入: 余量 > 0 的批次 + 启用中的机台
// 输出: 新建排产明细 + 批次余量递减
// ==========================================

use crate::domain::batch::ConsolidatedBatch;
use crate::domain::plan::PlanEntry;
use crate::engine::capacity::CapacityManager;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::machine_repo::MachineRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::plan_entry_repo::PlanEntryRepository;
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 无可用机台时自动创建的兜底机台
const DEFAULT_MACHINE_NAME: &str = "Default Line";
const DEFAULT_MACHINE_CAPACITY: i64 = 1000;

// ==========================================
// ProductionScheduler - 排产引擎
// ==========================================
pub struct ProductionScheduler {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionScheduler {
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

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成排产计划
    ///
    /// 规则:
    /// 1) 候选 = 余量 > 0 的批次; 优先级 = 贡献订单最早交期升序,批次ID升序兜底
    /// 2) 自 start_date（缺省当天）起逐日扫描,无固定窗口,余量清零即止
    /// 3) 每日按机台ID序遍历启用机台: allocated = min(可用产能, 批次余量);
    ///    落一条明细 (scheduled) 并递减余量; 同机台当日剩余产能继续让给下一优先级批次
    /// 4) 贪心不回溯: 已承诺给高优先级批次的产能不再收回
    /// 5) 重复执行只为尚未覆盖的余量分配,不重复分配已覆盖数量
    ///
    /// 整个运行在单事务内,失败整体回滚。
    ///
    /// # 参数
    /// - `start_date`: 起排日期（None = 当天）
    ///
    /// # 返回
    /// 本次新建的排产明细列表
    #[instrument(skip(self))]
    pub fn generate_plan(&self, start_date: Option<NaiveDate>) -> RepositoryResult<Vec<PlanEntry>> {
        let start = start_date.unwrap_or_else(|| Local::now().date_naive());

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let batches = BatchRepository::find_unplanned_on(&tx)?;
        if batches.is_empty() {
            return Ok(Vec::new());
        }

        // 批次优先级: 最早交期升序,ID升序保证确定性
        let mut ranked = Self::rank_batches(&tx, batches, start)?;

        // 启用机台; 空则创建兜底机台保证排产可进行
        let mut machines = MachineRepository::list_active_on(&tx)?;
        if machines.is_empty() {
            warn!("无启用机台,创建兜底机台 {}", DEFAULT_MACHINE_NAME);
            machines.push(MachineRepository::insert_on(
                &tx,
                DEFAULT_MACHINE_NAME,
                DEFAULT_MACHINE_CAPACITY,
            )?);
        }

        let total_capacity: i64 = machines.iter().map(|m| m.capacity_per_day).sum();
        if total_capacity <= 0 {
            return Err(RepositoryError::BusinessRuleViolation(
                "启用机台的日产能总和为 0,无法排产".to_string(),
            ));
        }

        let mut created = Vec::new();
        let mut outstanding: i64 = ranked.iter().map(|(_, b)| b.remaining_quantity).sum();
        let mut day = start;

        while outstanding > 0 {
            let mut day_allocated: i64 = 0;
            let mut day_committed: i64 = 0;

            for machine in &machines {
                let committed = PlanEntryRepository::committed_on(&tx, machine.id, day)?;
                day_committed += committed;

                let mut available = CapacityManager::available_capacity_on(&tx, machine, day)?;
                if available <= 0 {
                    continue;
                }

                // 同机台当日剩余产能依次让给下一优先级批次
                for (_, batch) in ranked.iter_mut() {
                    if batch.remaining_quantity <= 0 {
                        continue;
                    }
                    let allocated = available.min(batch.remaining_quantity);
                    let entry =
                        PlanEntryRepository::insert_on(&tx, day, batch.id, allocated, machine.id)?;
                    batch.remaining_quantity -= allocated;
                    BatchRepository::set_remaining_on(&tx, batch.id, batch.remaining_quantity)?;

                    available -= allocated;
                    outstanding -= allocated;
                    day_allocated += allocated;
                    created.push(entry);

                    if available == 0 {
                        break;
                    }
                }
            }

            // 当日颗粒无收且当日本无历史承诺 → 产能在而分配不动,属一致性故障
            if day_allocated == 0 && day_committed == 0 {
                return Err(RepositoryError::InternalError(format!(
                    "排产停滞: date={}, outstanding={}",
                    day, outstanding
                )));
            }

            day = day
                .succ_opt()
                .ok_or_else(|| RepositoryError::InternalError("排产日期溢出".to_string()))?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            entries = created.len(),
            start = %start,
            "排产计划生成完成"
        );
        Ok(created)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 批次按 (最早交期, 批次ID) 升序排序
    ///
    /// 贡献订单缺失（批次无法回溯到订单）时以起排日兜底
    fn rank_batches(
        conn: &Connection,
        batches: Vec<ConsolidatedBatch>,
        fallback: NaiveDate,
    ) -> RepositoryResult<Vec<(NaiveDate, ConsolidatedBatch)>> {
        let mut ranked = Vec::with_capacity(batches.len());
        for batch in batches {
            let earliest = OrderRepository::earliest_delivery_for_batch_on(conn, batch.id)?
                .unwrap_or(fallback);
            ranked.push((earliest, batch));
        }
        ranked.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        Ok(ranked)
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::order::NewSalesOrder;
    use crate::engine::consolidation::ConsolidationEngine;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn insert_order(
        conn: &Arc<Mutex<Connection>>,
        no: &str,
        product: &str,
        color: &str,
        qty: i64,
        delivery: (i32, u32, u32),
    ) {
        let guard = conn.lock().unwrap();
        OrderRepository::insert_on(
            &guard,
            &NewSalesOrder {
                order_no: no.to_string(),
                product_name: product.to_string(),
                color: color.to_string(),
                quantity: qty,
                delivery_date: NaiveDate::from_ymd_opt(delivery.0, delivery.1, delivery.2).unwrap(),
                notes: None,
            },
        )
        .unwrap();
    }

    fn insert_machine(conn: &Arc<Mutex<Connection>>, name: &str, capacity: i64) -> i64 {
        let guard = conn.lock().unwrap();
        MachineRepository::insert_on(&guard, name, capacity).unwrap().id
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_batch_splits_across_days() {
        // 一台 40/日机台 + 90 件批次 → 40 / 40 / 10 三天排完
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 90, (2024, 6, 10));
        insert_machine(&conn, "Line A", 40);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let entries = ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries
                .iter()
                .map(|e| (e.planned_date, e.quantity_planned))
                .collect::<Vec<_>>(),
            vec![
                (date(2024, 6, 1), 40),
                (date(2024, 6, 2), 40),
                (date(2024, 6, 3), 10),
            ]
        );

        let guard = conn.lock().unwrap();
        let remaining: i64 = guard
            .query_row(
                "SELECT remaining_quantity FROM consolidated_batch",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_capacity_invariant_per_machine_day() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 130, (2024, 6, 3));
        insert_order(&conn, "O2", "Table", "Oak", 70, (2024, 6, 4));
        insert_machine(&conn, "Line A", 40);
        insert_machine(&conn, "Line B", 25);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();

        let guard = conn.lock().unwrap();
        let mut stmt = guard
            .prepare(
                r#"SELECT pe.machine_id, pe.planned_date, SUM(pe.quantity_planned), m.capacity_per_day
                     FROM plan_entry pe JOIN machine m ON m.id = pe.machine_id
                    GROUP BY pe.machine_id, pe.planned_date"#,
            )
            .unwrap();
        let rows: Vec<(i64, String, i64, i64)> = stmt
            .query_map([], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert!(!rows.is_empty());
        for (_, _, planned, capacity) in rows {
            assert!(planned <= capacity);
        }
    }

    #[test]
    fn test_priority_by_earliest_delivery() {
        // 晚建批次但交期更早者优先占用首日产能
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 20));
        insert_order(&conn, "O2", "Table", "Oak", 30, (2024, 6, 2));
        insert_machine(&conn, "Line A", 40);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let entries = ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();

        // 首条明细属于交期 06-02 的 Table 批次
        let guard = conn.lock().unwrap();
        let product: String = guard
            .query_row(
                "SELECT b.product_name FROM plan_entry pe JOIN consolidated_batch b ON b.id = pe.batch_id WHERE pe.id = ?1",
                [entries[0].id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(product, "Table");

        // 同日富余产能让给次优批次: 40 = 30 (Table) + 10 (Chair)
        assert_eq!(entries[0].quantity_planned, 30);
        assert_eq!(entries[1].quantity_planned, 10);
        assert_eq!(entries[1].planned_date, date(2024, 6, 1));
    }

    #[test]
    fn test_rerun_allocates_only_remaining() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 50, (2024, 6, 10));
        insert_machine(&conn, "Line A", 50);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let scheduler = ProductionScheduler::new(conn.clone());
        let first = scheduler.generate_plan(Some(date(2024, 6, 1))).unwrap();
        assert_eq!(first.len(), 1);

        // 已全量覆盖,重复执行不再分配
        let second = scheduler.generate_plan(Some(date(2024, 6, 1))).unwrap();
        assert!(second.is_empty());

        let guard = conn.lock().unwrap();
        let total_planned: i64 = guard
            .query_row(
                "SELECT COALESCE(SUM(quantity_planned),0) FROM plan_entry",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(total_planned, 50);
    }

    #[test]
    fn test_rerun_with_new_batch_respects_prior_commitments() {
        // 首轮占满 06-01 后,新批次从剩余产能/后续日期接续
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 40, (2024, 6, 5));
        insert_machine(&conn, "Line A", 40);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let scheduler = ProductionScheduler::new(conn.clone());
        scheduler.generate_plan(Some(date(2024, 6, 1))).unwrap();

        insert_order(&conn, "O2", "Table", "Oak", 30, (2024, 6, 6));
        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let second = scheduler.generate_plan(Some(date(2024, 6, 1))).unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].planned_date, date(2024, 6, 2));
        assert_eq!(second[0].quantity_planned, 30);
    }

    #[test]
    fn test_creates_default_machine_when_none_active() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 10, (2024, 6, 5));

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let entries = ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();

        assert_eq!(entries.len(), 1);
        let guard = conn.lock().unwrap();
        let name: String = guard
            .query_row("SELECT name FROM machine WHERE id = ?1", [entries[0].machine_id], |r| r.get(0))
            .unwrap();
        assert_eq!(name, DEFAULT_MACHINE_NAME);
    }

    #[test]
    fn test_inactive_machine_not_allocated() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 5));
        let stopped = insert_machine(&conn, "Stopped", 100);
        {
            let guard = conn.lock().unwrap();
            guard
                .execute("UPDATE machine SET is_active = 0 WHERE id = ?1", [stopped])
                .unwrap();
        }
        insert_machine(&conn, "Line A", 30);

        ConsolidationEngine::new(conn.clone()).run().unwrap();
        let entries = ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();

        assert!(entries.iter().all(|e| e.machine_id != stopped));
    }

    #[test]
    fn test_no_unplanned_batches_returns_empty() {
        let conn = setup();
        insert_machine(&conn, "Line A", 40);
        let entries = ProductionScheduler::new(conn.clone())
            .generate_plan(Some(date(2024, 6, 1)))
            .unwrap();
        assert!(entries.is_empty());
    }
}
