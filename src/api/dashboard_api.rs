// ==========================================
// 销售订单排产系统 - 驾驶舱API
// ==========================================
// 职责: 聚合当日排程 / 待合并 / 完工 / 延误概览
// 说明: 订单状态为读取时推导,延误含"标记延误 ∪ 交期已过未完工"
// ==========================================

use crate::api::error::ApiResult;
use crate::api::order_api::{OrderApi, OrderView};
use crate::api::production_api::{PlanEntryView, ProductionApi};
use crate::domain::types::OrderStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 待合并订单列表的展示上限
const PENDING_LIST_LIMIT: usize = 50;
/// 延误订单列表的展示上限
const DELAYED_LIST_LIMIT: usize = 20;

// ==========================================
// DashboardStats - 驾驶舱聚合视图
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub today_plan_count: usize,
    pub pending_orders_count: usize,
    pub completed_orders_count: usize,
    pub delayed_orders_count: usize,
    pub today_plan: Vec<PlanEntryView>,
    pub pending_orders: Vec<OrderView>,
    pub delayed_orders: Vec<OrderView>,
}

// ==========================================
// DashboardApi - 驾驶舱API（组合订单/排产API）
// ==========================================
pub struct DashboardApi {
    order_api: Arc<OrderApi>,
    production_api: Arc<ProductionApi>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(order_api: Arc<OrderApi>, production_api: Arc<ProductionApi>) -> Self {
        Self {
            order_api,
            production_api,
        }
    }

    /// 聚合驾驶舱统计
    pub fn stats(&self) -> ApiResult<DashboardStats> {
        let today_plan = self.production_api.today_plan()?;
        let orders = self.order_api.list(None)?;

        let mut pending = Vec::new();
        let mut delayed = Vec::new();
        let mut completed_count = 0usize;
        for view in orders {
            match view.status {
                OrderStatus::Pending => pending.push(view),
                OrderStatus::Delayed => delayed.push(view),
                OrderStatus::Completed => completed_count += 1,
                OrderStatus::Consolidated => {}
            }
        }

        let stats = DashboardStats {
            today_plan_count: today_plan.len(),
            pending_orders_count: pending.len(),
            completed_orders_count: completed_count,
            delayed_orders_count: delayed.len(),
            today_plan,
            pending_orders: pending.into_iter().take(PENDING_LIST_LIMIT).collect(),
            delayed_orders: delayed.into_iter().take(DELAYED_LIST_LIMIT).collect(),
        };
        Ok(stats)
    }
}
