// ==========================================
// 销售订单排产系统 - 生产批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::batch::ConsolidatedBatch;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// BatchRepository - 生产批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的BatchRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询批次
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ConsolidatedBatch>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    /// 查询全部批次
    ///
    /// 排序: created_at 降序、id 降序: 最新批次在前,同秒内次序稳定
    pub fn list_all(&self) -> RepositoryResult<Vec<ConsolidatedBatch>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, id DESC",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // ==========================================
    // 事务内关联函数（供引擎在单事务中组合调用）
    // ==========================================

    const SELECT_BASE: &'static str = r#"SELECT id, product_name, color, total_quantity,
               remaining_quantity, order_nos, created_at
          FROM consolidated_batch"#;

    /// 插入批次（remaining_quantity 初始化为 total_quantity）
    pub fn insert_on(
        conn: &Connection,
        product_name: &str,
        color: &str,
        total_quantity: i64,
        order_nos: &[String],
    ) -> RepositoryResult<ConsolidatedBatch> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            r#"INSERT INTO consolidated_batch (
                product_name, color, total_quantity, remaining_quantity, order_nos, created_at
            ) VALUES (?1, ?2, ?3, ?3, ?4, ?5)"#,
            params![
                product_name,
                color,
                total_quantity,
                order_nos.join(","),
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(ConsolidatedBatch {
            id,
            product_name: product_name.to_string(),
            color: color.to_string(),
            total_quantity,
            remaining_quantity: total_quantity,
            order_nos: order_nos.to_vec(),
            created_at,
        })
    }

    /// 按ID查询（事务内可用）
    pub fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<ConsolidatedBatch>> {
        match conn.query_row(
            &format!("{} WHERE id = ?1", Self::SELECT_BASE),
            params![id],
            Self::map_row,
        ) {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询未排完的批次 (remaining_quantity > 0)，按ID升序
    pub fn find_unplanned_on(conn: &Connection) -> RepositoryResult<Vec<ConsolidatedBatch>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE remaining_quantity > 0 ORDER BY id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 更新批次余量
    ///
    /// 余量越界属于排产引擎的一致性缺陷，直接拒绝
    pub fn set_remaining_on(conn: &Connection, id: i64, remaining: i64) -> RepositoryResult<()> {
        if remaining < 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "批次余量不可为负: batch_id={}, remaining={}",
                id, remaining
            )));
        }
        let changed = conn.execute(
            "UPDATE consolidated_batch SET remaining_quantity = ?1 WHERE id = ?2 AND total_quantity >= ?1",
            params![remaining, id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ConsolidatedBatch".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除全部批次（reset 专用，须在事务内先清空排产明细）
    pub fn delete_all_on(conn: &Connection) -> RepositoryResult<usize> {
        Ok(conn.execute("DELETE FROM consolidated_batch", [])?)
    }

    /// 映射数据库行到ConsolidatedBatch对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ConsolidatedBatch> {
        let order_nos_raw: String = row.get(5)?;
        let created_raw: String = row.get(6)?;

        Ok(ConsolidatedBatch {
            id: row.get(0)?,
            product_name: row.get(1)?,
            color: row.get(2)?,
            total_quantity: row.get(3)?,
            remaining_quantity: row.get(4)?,
            order_nos: ConsolidatedBatch::split_order_nos(&order_nos_raw),
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
