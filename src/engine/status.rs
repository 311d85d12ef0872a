// ==========================================
// 销售订单排产系统 - 订单状态推导引擎
// ==========================================
// 职责: 从批次/排产明细状态 + 当前日期推导订单展示状态
// 约定: 读取时推导（纯函数）,不跑后台任务; 推导不回写合并标记
// ==========================================
// 推导规则:
// - completed: 人工置完工,或批次明细齐全且全部完工
// - delayed:   交期已过且未完工（覆盖 pending/consolidated 的展示态）
// - consolidated: 已并入批次
// - pending:   其余
// ==========================================

use crate::domain::order::SalesOrder;
use crate::domain::types::OrderStatus;
use chrono::NaiveDate;

// ==========================================
// BatchPlanProgress - 批次完工进度
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPlanProgress {
    pub entry_count: i64,     // 明细总数
    pub completed_count: i64, // 已完工明细数
}

impl BatchPlanProgress {
    /// 明细齐全且全部完工
    pub fn is_completed(&self) -> bool {
        self.entry_count > 0 && self.completed_count == self.entry_count
    }
}

// ==========================================
// StatusReconciler - 状态推导引擎
// ==========================================
pub struct StatusReconciler {
    // 无状态引擎,不需要注入依赖
}

impl StatusReconciler {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 推导订单展示状态
    ///
    /// # 参数
    /// - `order`: 订单（含存储状态与合并标记）
    /// - `progress`: 订单所属批次的完工进度（未合并时为 None）
    /// - `today`: 当前日期
    pub fn derive(
        &self,
        order: &SalesOrder,
        progress: Option<&BatchPlanProgress>,
        today: NaiveDate,
    ) -> OrderStatus {
        let completed = order.status == OrderStatus::Completed
            || progress.map(|p| p.is_completed()).unwrap_or(false);
        if completed {
            return OrderStatus::Completed;
        }

        if order.delivery_date < today {
            return OrderStatus::Delayed;
        }

        if order.is_consolidated() {
            OrderStatus::Consolidated
        } else {
            OrderStatus::Pending
        }
    }
}

impl Default for StatusReconciler {
    fn default() -> Self {
        Self::new()
    }
}
