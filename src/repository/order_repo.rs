// ==========================================
// 销售订单排产系统 - 销售订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: `*_on` 关联函数在引擎事务内复用（std Mutex 不可重入,
//       事务内不得再次经由实例方法加锁）
// ==========================================

use crate::domain::order::{NewSalesOrder, SalesOrder};
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 销售订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的OrderRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建订单
    ///
    /// 重复行项目 (order_no, product, color) 由唯一约束拦截
    pub fn insert(&self, order: &NewSalesOrder) -> RepositoryResult<SalesOrder> {
        let conn = self.get_conn()?;
        Self::insert_on(&conn, order)
    }

    /// 按内部ID查询订单
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<SalesOrder>> {
        let conn = self.get_conn()?;
        Self::find_by_id_on(&conn, id)
    }

    /// 查询订单列表（可按存储状态过滤），按交期升序
    pub fn list(&self, status: Option<OrderStatus>) -> RepositoryResult<Vec<SalesOrder>> {
        let conn = self.get_conn()?;

        let mut result = Vec::new();
        match status {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = ?1 ORDER BY delivery_date, id",
                    Self::SELECT_BASE
                ))?;
                let rows = stmt.query_map(params![s.to_string()], Self::map_row)?;
                for row in rows {
                    result.push(row?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("{} ORDER BY delivery_date, id", Self::SELECT_BASE))?;
                let rows = stmt.query_map([], Self::map_row)?;
                for row in rows {
                    result.push(row?);
                }
            }
        }
        Ok(result)
    }

    /// 人工更新订单存储状态
    pub fn update_status(&self, id: i64, status: OrderStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE sales_order SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "SalesOrder".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除订单
    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM sales_order WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "SalesOrder".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除全部订单
    pub fn delete_all(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM sales_order", [])?)
    }

    /// 查询批次的贡献订单
    pub fn find_by_batch(&self, batch_id: i64) -> RepositoryResult<Vec<SalesOrder>> {
        let conn = self.get_conn()?;
        Self::find_by_batch_on(&conn, batch_id)
    }

    // ==========================================
    // 事务内关联函数（供引擎在单事务中组合调用）
    // ==========================================

    const SELECT_BASE: &'static str = r#"SELECT id, order_no, product_name, color, quantity,
               delivery_date, status, batch_id, notes, created_at
          FROM sales_order"#;

    /// 插入订单（事务内可用）
    pub fn insert_on(conn: &Connection, order: &NewSalesOrder) -> RepositoryResult<SalesOrder> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            r#"INSERT INTO sales_order (
                order_no, product_name, color, quantity,
                delivery_date, status, batch_id, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', NULL, ?6, ?7)"#,
            params![
                &order.order_no,
                &order.product_name,
                &order.color,
                order.quantity,
                order.delivery_date.format("%Y-%m-%d").to_string(),
                &order.notes,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(SalesOrder {
            id,
            order_no: order.order_no.clone(),
            product_name: order.product_name.clone(),
            color: order.color.clone(),
            quantity: order.quantity,
            delivery_date: order.delivery_date,
            status: OrderStatus::Pending,
            batch_id: None,
            notes: order.notes.clone(),
            created_at,
        })
    }

    /// 按ID查询（事务内可用）
    pub fn find_by_id_on(conn: &Connection, id: i64) -> RepositoryResult<Option<SalesOrder>> {
        match conn.query_row(
            &format!("{} WHERE id = ?1", Self::SELECT_BASE),
            params![id],
            Self::map_row,
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询待合并订单: 未并入批次且状态为 pending
    ///
    /// 排序: 交期升序、ID升序,决定批次贡献订单列表的遇到顺序
    pub fn find_unconsolidated_on(conn: &Connection) -> RepositoryResult<Vec<SalesOrder>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = 'pending' AND batch_id IS NULL ORDER BY delivery_date, id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 将订单并入批次: 写 batch_id 并置状态 consolidated
    pub fn assign_batch_on(conn: &Connection, order_id: i64, batch_id: i64) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE sales_order SET batch_id = ?1, status = 'consolidated' WHERE id = ?2",
            params![batch_id, order_id],
        )?;
        Ok(())
    }

    /// 查询批次的贡献订单（事务内可用）
    pub fn find_by_batch_on(conn: &Connection, batch_id: i64) -> RepositoryResult<Vec<SalesOrder>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE batch_id = ?1 ORDER BY delivery_date, id",
            Self::SELECT_BASE
        ))?;
        let rows = stmt.query_map(params![batch_id], Self::map_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 批次的最早交期（排产优先级的依据）
    pub fn earliest_delivery_for_batch_on(
        conn: &Connection,
        batch_id: i64,
    ) -> RepositoryResult<Option<NaiveDate>> {
        let raw: Option<String> = conn.query_row(
            "SELECT MIN(delivery_date) FROM sales_order WHERE batch_id = ?1",
            params![batch_id],
            |row| row.get(0),
        )?;
        match raw {
            Some(s) => {
                let date = NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                    RepositoryError::DatabaseQueryError(format!("非法交期 {}: {}", s, e))
                })?;
                Ok(Some(date))
            }
            None => Ok(None),
        }
    }

    /// 全量重置: 所有订单回到 pending、解除批次关联
    pub fn reset_all_on(conn: &Connection) -> RepositoryResult<usize> {
        Ok(conn.execute(
            "UPDATE sales_order SET status = 'pending', batch_id = NULL",
            [],
        )?)
    }

    /// 映射数据库行到SalesOrder对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SalesOrder> {
        let delivery_raw: String = row.get(5)?;
        let status_raw: String = row.get(6)?;
        let created_raw: String = row.get(9)?;

        Ok(SalesOrder {
            id: row.get(0)?,
            order_no: row.get(1)?,
            product_name: row.get(2)?,
            color: row.get(3)?,
            quantity: row.get(4)?,
            delivery_date: NaiveDate::parse_from_str(&delivery_raw, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?,
            status: status_raw.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })?,
            batch_id: row.get(7)?,
            notes: row.get(8)?,
            created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        9,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
        })
    }
}
