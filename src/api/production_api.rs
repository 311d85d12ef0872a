// ==========================================
// 销售订单排产系统 - 排产API
// ==========================================
// 职责: 触发排产 / 查询排程视图 / 明细状态流转
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::plan::PlanEntry;
use crate::domain::types::PlanEntryStatus;
use crate::engine::scheduler::ProductionScheduler;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::plan_entry_repo::PlanEntryRepository;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// PlanEntryView - 排产明细展示视图（携带批次产品/颜色）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntryView {
    pub id: i64,
    pub planned_date: NaiveDate,
    pub batch_id: Option<i64>,
    pub product_name: String,
    pub color: String,
    pub quantity_planned: i64,
    pub status: PlanEntryStatus,
    pub machine_id: i64,
}

// ==========================================
// ProductionApi - 排产API
// ==========================================
pub struct ProductionApi {
    scheduler: Arc<ProductionScheduler>,
    plan_entry_repo: Arc<PlanEntryRepository>,
    batch_repo: Arc<BatchRepository>,
}

impl ProductionApi {
    /// 创建新的ProductionApi实例
    pub fn new(
        scheduler: Arc<ProductionScheduler>,
        plan_entry_repo: Arc<PlanEntryRepository>,
        batch_repo: Arc<BatchRepository>,
    ) -> Self {
        Self {
            scheduler,
            plan_entry_repo,
            batch_repo,
        }
    }

    /// 生成排产计划,返回本次新建的明细
    pub fn generate_plan(&self, start_date: Option<NaiveDate>) -> ApiResult<Vec<PlanEntry>> {
        Ok(self.scheduler.generate_plan(start_date)?)
    }

    /// 查询日期区间（闭区间）的排程视图
    pub fn schedule_range(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Vec<PlanEntryView>> {
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "日期区间非法: from={} > to={}",
                from, to
            )));
        }
        let entries = self.plan_entry_repo.find_by_date_range(from, to)?;
        self.build_views(&entries)
    }

    /// 查询当日排程视图
    pub fn today_plan(&self) -> ApiResult<Vec<PlanEntryView>> {
        let entries = self.plan_entry_repo.find_by_date(Local::now().date_naive())?;
        self.build_views(&entries)
    }

    /// 排产明细状态流转（只进不退）
    pub fn update_entry_status(&self, id: i64, target: PlanEntryStatus) -> ApiResult<PlanEntry> {
        let entry = self
            .plan_entry_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("PlanEntry(id={})不存在", id)))?;

        if !entry.status.can_transition_to(target) {
            return Err(ApiError::InvalidStateTransition {
                from: entry.status.to_string(),
                to: target.to_string(),
            });
        }

        self.plan_entry_repo.update_status(id, target)?;
        Ok(PlanEntry {
            status: target,
            ..entry
        })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 组装展示视图（同批次信息只查一次; 无批次的历史/手工行留空）
    pub(crate) fn build_views(&self, entries: &[PlanEntry]) -> ApiResult<Vec<PlanEntryView>> {
        let mut batch_cache: HashMap<i64, (String, String)> = HashMap::new();

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let (product_name, color) = match entry.batch_id {
                Some(batch_id) => {
                    if !batch_cache.contains_key(&batch_id) {
                        let pair = self
                            .batch_repo
                            .find_by_id(batch_id)?
                            .map(|b| (b.product_name, b.color))
                            .unwrap_or_default();
                        batch_cache.insert(batch_id, pair);
                    }
                    batch_cache[&batch_id].clone()
                }
                None => (String::new(), String::new()),
            };

            views.push(PlanEntryView {
                id: entry.id,
                planned_date: entry.planned_date,
                batch_id: entry.batch_id,
                product_name,
                color,
                quantity_planned: entry.quantity_planned,
                status: entry.status,
                machine_id: entry.machine_id,
            });
        }
        Ok(views)
    }
}
