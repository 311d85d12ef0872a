// ==========================================
// 销售订单排产系统 - 订单合并引擎
// ==========================================
// 职责: 将未合并订单按 (产品, 颜色) 归并为生产批次
// 红线: 合并与重置必须整体成功或整体回滚,不允许部分落库
// ==========================================
// 输入: 未合并订单 (status=pending, batch_id IS NULL)
// 输出: 新建批次 + 订单打上合并标记
// ==========================================

use crate::domain::batch::ConsolidatedBatch;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::OrderRepository;
use crate::repository::plan_entry_repo::PlanEntryRepository;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

// ==========================================
// ResetSummary - 全量重置结果
// ==========================================
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ResetSummary {
    pub plan_entries_deleted: usize,
    pub batches_deleted: usize,
    pub orders_reverted: usize,
}

// ==========================================
// ConsolidationEngine - 订单合并引擎
// ==========================================
pub struct ConsolidationEngine {
    conn: Arc<Mutex<Connection>>,
}

impl ConsolidationEngine {
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

    /// 执行订单合并
    ///
    /// 规则:
    /// 1) 只选取 status=pending 且未并入批次的订单（按交期、ID排序）
    /// 2) 按 (product_name, color) 精确分组（区分大小写,不做修剪）
    /// 3) 每组生成一个批次: total = Σ数量, 贡献订单按遇到顺序记录
    /// 4) 组内订单统一打合并标记 (batch_id + status=consolidated)
    ///
    /// 幂等: 无新增待合并订单时返回空列表,不产生任何写入
    ///
    /// # 返回
    /// 本次新建的批次列表（历史批次不重复返回）
    #[instrument(skip(self))]
    pub fn run(&self) -> RepositoryResult<Vec<ConsolidatedBatch>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let pending = OrderRepository::find_unconsolidated_on(&tx)?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        // 分组: HashMap 记录组下标,Vec 保持首次遇到的组顺序
        let mut group_index: HashMap<(String, String), usize> = HashMap::new();
        let mut groups: Vec<((String, String), Vec<usize>)> = Vec::new();
        for (idx, order) in pending.iter().enumerate() {
            let key = (order.product_name.clone(), order.color.clone());
            match group_index.get(&key) {
                Some(&g) => groups[g].1.push(idx),
                None => {
                    group_index.insert(key.clone(), groups.len());
                    groups.push((key, vec![idx]));
                }
            }
        }

        let mut created = Vec::with_capacity(groups.len());
        for ((product_name, color), member_idx) in groups {
            let total: i64 = member_idx.iter().map(|&i| pending[i].quantity).sum();
            let order_nos: Vec<String> = member_idx
                .iter()
                .map(|&i| pending[i].order_no.clone())
                .collect();

            let batch =
                BatchRepository::insert_on(&tx, &product_name, &color, total, &order_nos)?;
            for &i in &member_idx {
                OrderRepository::assign_batch_on(&tx, pending[i].id, batch.id)?;
            }
            created.push(batch);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            batches = created.len(),
            orders = pending.len(),
            "订单合并完成"
        );
        Ok(created)
    }

    /// 全量重置
    ///
    /// 单事务内: 删除全部排产明细 → 删除全部批次 → 订单回到 pending。
    /// 已承诺产能由明细推导,随明细删除自动清零。
    /// 任一步失败整体回滚,外部观察不到部分删除。
    #[instrument(skip(self))]
    pub fn reset_all(&self) -> RepositoryResult<ResetSummary> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let plan_entries_deleted = PlanEntryRepository::delete_all_on(&tx)?;
        let batches_deleted = BatchRepository::delete_all_on(&tx)?;
        let orders_reverted = OrderRepository::reset_all_on(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            plan_entries_deleted,
            batches_deleted, orders_reverted, "全量重置完成"
        );
        Ok(ResetSummary {
            plan_entries_deleted,
            batches_deleted,
            orders_reverted,
        })
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
    use chrono::NaiveDate;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn insert_order(conn: &Arc<Mutex<Connection>>, no: &str, product: &str, color: &str, qty: i64, delivery: (i32, u32, u32)) {
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

    #[test]
    fn test_run_merges_same_product_color() {
        // 同产品同颜色的两单合并为一个批次,贡献订单按交期顺序
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 1));
        insert_order(&conn, "O2", "Chair", "Red", 20, (2024, 6, 5));

        let engine = ConsolidationEngine::new(conn.clone());
        let batches = engine.run().unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].product_name, "Chair");
        assert_eq!(batches[0].color, "Red");
        assert_eq!(batches[0].total_quantity, 50);
        assert_eq!(batches[0].remaining_quantity, 50);
        assert_eq!(batches[0].order_nos, vec!["O1", "O2"]);
    }

    #[test]
    fn test_run_is_case_sensitive_on_grouping_key() {
        // 精确匹配: "Red" 与 "red" 不同组
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 10, (2024, 6, 1));
        insert_order(&conn, "O2", "Chair", "red", 10, (2024, 6, 1));

        let engine = ConsolidationEngine::new(conn.clone());
        let batches = engine.run().unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 1));

        let engine = ConsolidationEngine::new(conn.clone());
        let first = engine.run().unwrap();
        assert_eq!(first.len(), 1);

        // 第二次运行: 无新订单 → 空结果,不产生新批次
        let second = engine.run().unwrap();
        assert!(second.is_empty());

        let guard = conn.lock().unwrap();
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM consolidated_batch", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_run_conserves_total_quantity() {
        // 批次总量之和 == 被合并订单数量之和
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 1));
        insert_order(&conn, "O2", "Chair", "Blue", 25, (2024, 6, 2));
        insert_order(&conn, "O3", "Table", "Red", 45, (2024, 6, 3));
        insert_order(&conn, "O4", "Chair", "Red", 20, (2024, 6, 5));

        let engine = ConsolidationEngine::new(conn.clone());
        let batches = engine.run().unwrap();

        let total: i64 = batches.iter().map(|b| b.total_quantity).sum();
        assert_eq!(total, 30 + 25 + 45 + 20);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_reset_all_reverts_everything() {
        let conn = setup();
        insert_order(&conn, "O1", "Chair", "Red", 30, (2024, 6, 1));

        let engine = ConsolidationEngine::new(conn.clone());
        engine.run().unwrap();

        let summary = engine.reset_all().unwrap();
        assert_eq!(summary.batches_deleted, 1);
        assert_eq!(summary.orders_reverted, 1);

        let guard = conn.lock().unwrap();
        let batch_count: i64 = guard
            .query_row("SELECT COUNT(*) FROM consolidated_batch", [], |r| r.get(0))
            .unwrap();
        assert_eq!(batch_count, 0);
        let pending: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM sales_order WHERE status='pending' AND batch_id IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(pending, 1);
    }
}
