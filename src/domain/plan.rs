// ==========================================
// 销售订单排产系统 - 排产明细领域模型
// ==========================================
// 红线: 排产明细只由排产引擎创建
// 不变式: 任意 (machine, date) 上 SUM(quantity_planned) <= machine.capacity_per_day
// ==========================================

use crate::domain::types::PlanEntryStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// PlanEntry - 排产明细
// ==========================================
// 一个批次可拆出多条明细（跨天/跨机台）；batch_id 仅历史/手工行可为空
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub id: i64,                      // 明细ID
    pub planned_date: NaiveDate,      // 排产日期
    pub batch_id: Option<i64>,        // 关联批次
    pub quantity_planned: i64,        // 排产数量 (正整数)
    pub status: PlanEntryStatus,      // 状态
    pub machine_id: i64,              // 机台ID
    pub created_at: NaiveDateTime,    // 创建时间
}

impl PlanEntry {
    /// 判断是否已完工
    pub fn is_completed(&self) -> bool {
        self.status == PlanEntryStatus::Completed
    }
}
