// ==========================================
// 销售订单排产系统 - 机台数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::machine::{Machine, MachineUpdate};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// MachineRepository - 机台仓储
// ==========================================
pub struct MachineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineRepository {
    /// 创建新的MachineRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建机台
    pub fn insert(&self, name: &str, capacity_per_day: i64) -> RepositoryResult<Machine> {
        let conn = self.get_conn()?;
        Self::insert_on(&conn, name, capacity_per_day)
    }

    /// 按ID查询机台
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    /// 查询启用中的机台，按ID升序（排产遍历顺序）
    pub fn list_active(&self) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        Self::list_active_on(&conn)
    }

    /// 部分更新机台
    pub fn update(&self, id: i64, update: &MachineUpdate) -> RepositoryResult<Machine> {
        let conn = self.get_conn()?;

        let existing = Self::find_by_id_on(&conn, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Machine".to_string(),
            id: id.to_string(),
        })?;

        let name = update.name.clone().unwrap_or(existing.name);
        let capacity = update.capacity_per_day.unwrap_or(existing.capacity_per_day);
        let is_active = update.is_active.unwrap_or(existing.is_active);

        conn.execute(
            "UPDATE machine SET name = ?1, capacity_per_day = ?2, is_active = ?3 WHERE id = ?4",
            params![name, capacity, is_active as i64, id],
        )?;

        Ok(Machine {
            id,
            name,
            capacity_per_day: capacity,
            is_active,
            created_at: existing.created_at,
        })
    }

    /// 停用机台（软删除）
    pub fn deactivate(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE machine SET is_active = 0 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Machine".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 事务内关联函数（供引擎在单事务中组合调用）
    // ==========================================

    const SELECT_BASE: &'static str =
        "SELECT id, name, capacity_per_day, is_active, created_at FROM machine";

    /// 插入机台（事务内可用）
    pub fn insert_on(conn: &Connection, name: &str, capacity_per_day: i64) -> RepositoryResult<Machine> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            r#"INSERT INTO machine (name, capacity_per_day, is_active, created_at)
               VALUES (?1, ?2, 1, ?3)"#,
            params![
                name,
                capacity_per_day,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Machine {
            id,
            name: name.to_string(),
            capacity_per_day,
            is_active: true,
            created_at,
        })
    }

    /// 按ID查询（事务内可用）
    pub fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<Machine>> {
        match conn.query_row(
            &format!("{} WHERE id = ?1", Self::SELECT_BASE),
            params![id],
            Self::map_row,
        ) {
            Ok(machine) => Ok(Some(machine)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询启用中的机台（事务内可用）
    pub fn list_active_on(conn: &Connection) -> RepositoryResult<Vec<Machine>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE is_active = 1 ORDER BY id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 映射数据库行到Machine对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Machine> {
        let created_raw: String = row.get(4)?;
        Ok(Machine {
            id: row.get(0)?,
            name: row.get(1)?,
            capacity_per_day: row.get(2)?,
            is_active: row.get::<_, i64>(3)? != 0,
            created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
        })
    }
}
