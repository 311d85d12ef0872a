// ==========================================
// 销售订单排产系统 - 合并API
// ==========================================
// 职责: 触发订单合并 / 查询批次 / 全量重置
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::batch::ConsolidatedBatch;
use crate::engine::consolidation::{ConsolidationEngine, ResetSummary};
use crate::repository::batch_repo::BatchRepository;
use std::sync::Arc;
use tracing::info;

// ==========================================
// ConsolidationApi - 合并API
// ==========================================
pub struct ConsolidationApi {
    engine: Arc<ConsolidationEngine>,
    batch_repo: Arc<BatchRepository>,
}

impl ConsolidationApi {
    /// 创建新的ConsolidationApi实例
    pub fn new(engine: Arc<ConsolidationEngine>, batch_repo: Arc<BatchRepository>) -> Self {
        Self { engine, batch_repo }
    }

    /// 执行订单合并,返回本次新建的批次（可能为空）
    pub fn run_consolidation(&self) -> ApiResult<Vec<ConsolidatedBatch>> {
        Ok(self.engine.run()?)
    }

    /// 查询全部批次（最新在前,次序稳定）
    pub fn list_batches(&self) -> ApiResult<Vec<ConsolidatedBatch>> {
        Ok(self.batch_repo.list_all()?)
    }

    /// 全量重置（破坏性操作,调用方需二次确认）
    pub fn reset_all(&self) -> ApiResult<ResetSummary> {
        let summary = self.engine.reset_all()?;
        info!(
            plan_entries = summary.plan_entries_deleted,
            batches = summary.batches_deleted,
            orders = summary.orders_reverted,
            "重置完成"
        );
        Ok(summary)
    }
}
