// ==========================================
// 销售订单排产系统 - 排产明细数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 已承诺产能永远由明细聚合推导,不落独立计数器
// ==========================================

use crate::domain::plan::PlanEntry;
use crate::domain::types::PlanEntryStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// PlanEntryRepository - 排产明细仓储
// ==========================================
pub struct PlanEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanEntryRepository {
    /// 创建新的PlanEntryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询明细
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<PlanEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    /// 查询某日的排产明细，按机台、ID排序
    pub fn find_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<PlanEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE planned_date = ?1 ORDER BY machine_id, id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 查询日期区间（闭区间）的排产明细
    pub fn find_by_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<PlanEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE planned_date BETWEEN ?1 AND ?2 ORDER BY planned_date, machine_id, id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map(
            params![
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            Self::map_row,
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 查询批次的全部明细
    pub fn find_by_batch(&self, batch_id: i64) -> RepositoryResult<Vec<PlanEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_batch_on(&conn, batch_id)
    }

    /// 更新明细状态（状态机校验由引擎层负责）
    pub fn update_status(&self, id: i64, status: PlanEntryStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE plan_entry SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "PlanEntry".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 批次完工进度: (明细总数, 已完工数)
    pub fn batch_completion(&self, batch_id: i64) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        Self::batch_completion_on(&conn, batch_id)
    }

    // ==========================================
    // 事务内关联函数（供引擎在单事务中组合调用）
    // ==========================================

    const SELECT_BASE: &'static str = r#"SELECT id, planned_date, batch_id, quantity_planned,
               status, machine_id, created_at
          FROM plan_entry"#;

    /// 插入排产明细（状态固定为 scheduled）
    pub fn insert_on(
        conn: &Connection,
        planned_date: NaiveDate,
        batch_id: i64,
        quantity_planned: i64,
        machine_id: i64,
    ) -> RepositoryResult<PlanEntry> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            r#"INSERT INTO plan_entry (
                planned_date, batch_id, quantity_planned, status, machine_id, created_at
            ) VALUES (?1, ?2, ?3, 'scheduled', ?4, ?5)"#,
            params![
                planned_date.format("%Y-%m-%d").to_string(),
                batch_id,
                quantity_planned,
                machine_id,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(PlanEntry {
            id,
            planned_date,
            batch_id: Some(batch_id),
            quantity_planned,
            status: PlanEntryStatus::Scheduled,
            machine_id,
            created_at,
        })
    }

    /// 按ID查询明细（事务内可用）
    pub fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<PlanEntry>> {
        match conn.query_row(
            &format!("{} WHERE id = ?1", Self::SELECT_BASE),
            params![id],
            Self::map_row,
        ) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// (machine, date) 已承诺数量,永远实时聚合,不缓存
    pub fn committed_on(
        conn: &Connection,
        machine_id: i64,
        date: NaiveDate,
    ) -> RepositoryResult<i64> {
        let committed: i64 = conn.query_row(
            r#"SELECT COALESCE(SUM(quantity_planned), 0)
                 FROM plan_entry
                WHERE machine_id = ?1 AND planned_date = ?2"#,
            params![machine_id, date.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;
        Ok(committed)
    }

    /// 查询批次的全部明细（事务内可用）
    pub fn find_by_batch_on(conn: &Connection, batch_id: i64) -> RepositoryResult<Vec<PlanEntry>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE batch_id = ?1 ORDER BY planned_date, machine_id, id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map(params![batch_id], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 批次完工进度（事务内可用）: (明细总数, 已完工数)
    pub fn batch_completion_on(conn: &Connection, batch_id: i64) -> RepositoryResult<(i64, i64)> {
        let pair = conn.query_row(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
                 FROM plan_entry
                WHERE batch_id = ?1"#,
            params![batch_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(pair)
    }

    /// 删除全部明细（reset 专用）
    pub fn delete_all_on(conn: &Connection) -> RepositoryResult<usize> {
        Ok(conn.execute("DELETE FROM plan_entry", [])?)
    }

    /// 映射数据库行到PlanEntry对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<PlanEntry> {
        let date_raw: String = row.get(1)?;
        let status_raw: String = row.get(4)?;
        let created_raw: String = row.get(6)?;

        Ok(PlanEntry {
            id: row.get(0)?,
            planned_date: NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?,
            batch_id: row.get(2)?,
            quantity_planned: row.get(3)?,
            status: status_raw.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
            })?,
            machine_id: row.get(5)?,
            created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        6,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
        })
    }
}
