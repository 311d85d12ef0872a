// ==========================================
// 销售订单排产系统 - 机台领域模型
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Machine - 生产机台
// ==========================================
// 停用为软删除 (is_active=false)，停用机台永不参与排产
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,                      // 机台ID
    pub name: String,                 // 机台名称
    pub capacity_per_day: i64,        // 日产能 (正整数)
    pub is_active: bool,              // 启用标记
    pub created_at: NaiveDateTime,    // 创建时间
}

// ==========================================
// MachineUpdate - 机台部分更新
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineUpdate {
    pub name: Option<String>,
    pub capacity_per_day: Option<i64>,
    pub is_active: Option<bool>,
}
