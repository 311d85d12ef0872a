// ==========================================
// 销售订单排产系统 - 订单API
// ==========================================
// 职责: 订单增删查改 + 读取时状态推导
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::{NewSalesOrder, SalesOrder};
use crate::domain::types::OrderStatus;
use crate::engine::status::{BatchPlanProgress, StatusReconciler};
use crate::repository::order_repo::OrderRepository;
use crate::repository::plan_entry_repo::PlanEntryRepository;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// OrderView - 订单展示视图（状态为推导结果）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub order_no: String,
    pub product_name: String,
    pub quantity: i64,
    pub color: String,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
}

// ==========================================
// OrderApi - 订单API
// ==========================================
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    plan_entry_repo: Arc<PlanEntryRepository>,
    reconciler: StatusReconciler,
}

impl OrderApi {
    /// 创建新的OrderApi实例
    pub fn new(order_repo: Arc<OrderRepository>, plan_entry_repo: Arc<PlanEntryRepository>) -> Self {
        Self {
            order_repo,
            plan_entry_repo,
            reconciler: StatusReconciler::new(),
        }
    }

    /// 创建订单
    pub fn create(&self, input: &NewSalesOrder) -> ApiResult<SalesOrder> {
        if input.order_no.trim().is_empty() {
            return Err(ApiError::InvalidInput("订单号不能为空".to_string()));
        }
        if input.product_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品名称不能为空".to_string()));
        }
        if input.color.trim().is_empty() {
            return Err(ApiError::InvalidInput("颜色不能为空".to_string()));
        }
        if input.quantity <= 0 {
            return Err(ApiError::ValidationError(format!(
                "数量必须为正数, 实际 {}",
                input.quantity
            )));
        }

        Ok(self.order_repo.insert(input)?)
    }

    /// 查询订单列表（按推导后的展示状态过滤）
    pub fn list(&self, status: Option<OrderStatus>) -> ApiResult<Vec<OrderView>> {
        let today = Local::now().date_naive();
        let orders = self.order_repo.list(None)?;
        let views = self.derive_views(&orders, today)?;

        Ok(match status {
            Some(s) => views.into_iter().filter(|v| v.status == s).collect(),
            None => views,
        })
    }

    /// 按ID查询订单（状态为推导结果）
    pub fn get(&self, id: i64) -> ApiResult<OrderView> {
        let order = self
            .order_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("SalesOrder(id={})不存在", id)))?;
        let today = Local::now().date_naive();
        let mut views = self.derive_views(std::slice::from_ref(&order), today)?;
        Ok(views.remove(0))
    }

    /// 人工更新订单存储状态
    pub fn update_status(&self, id: i64, status: OrderStatus) -> ApiResult<()> {
        Ok(self.order_repo.update_status(id, status)?)
    }

    /// 删除订单
    pub fn delete(&self, id: i64) -> ApiResult<()> {
        Ok(self.order_repo.delete(id)?)
    }

    /// 删除全部订单
    pub fn delete_all(&self) -> ApiResult<usize> {
        Ok(self.order_repo.delete_all()?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 批量推导展示状态（同批次进度只查一次）
    fn derive_views(&self, orders: &[SalesOrder], today: NaiveDate) -> ApiResult<Vec<OrderView>> {
        let mut progress_cache: HashMap<i64, BatchPlanProgress> = HashMap::new();

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let progress = match order.batch_id {
                Some(batch_id) => {
                    if !progress_cache.contains_key(&batch_id) {
                        let (entry_count, completed_count) =
                            self.plan_entry_repo.batch_completion(batch_id)?;
                        progress_cache.insert(
                            batch_id,
                            BatchPlanProgress {
                                entry_count,
                                completed_count,
                            },
                        );
                    }
                    progress_cache.get(&batch_id)
                }
                None => None,
            };

            views.push(OrderView {
                id: order.id,
                order_no: order.order_no.clone(),
                product_name: order.product_name.clone(),
                quantity: order.quantity,
                color: order.color.clone(),
                delivery_date: order.delivery_date,
                status: self.reconciler.derive(order, progress, today),
            });
        }
        Ok(views)
    }
}
