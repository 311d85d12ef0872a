// ==========================================
// 销售订单排产系统 - 领域类型定义
// ==========================================
// 状态存储格式: 小写下划线（与数据库/历史数据一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// pending      - 待合并
// consolidated - 已并入批次
// completed    - 批次排产明细全部完工
// delayed      - 交期已过且未完工（展示态覆盖前两者）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Consolidated,
    Completed,
    Delayed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Consolidated => write!(f, "consolidated"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Delayed => write!(f, "delayed"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "consolidated" => Ok(OrderStatus::Consolidated),
            "completed" => Ok(OrderStatus::Completed),
            "delayed" => Ok(OrderStatus::Delayed),
            other => Err(format!("未知的订单状态: {}", other)),
        }
    }
}

// ==========================================
// 排产明细状态 (Plan Entry Status)
// ==========================================
// 状态机: scheduled → in_progress → completed（只进不退，允许跳过 in_progress）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl PlanEntryStatus {
    /// 状态序（用于禁止回退）
    fn rank(self) -> u8 {
        match self {
            PlanEntryStatus::Scheduled => 0,
            PlanEntryStatus::InProgress => 1,
            PlanEntryStatus::Completed => 2,
        }
    }

    /// 判断是否允许迁移到目标状态
    pub fn can_transition_to(self, target: PlanEntryStatus) -> bool {
        target.rank() > self.rank()
    }
}

impl fmt::Display for PlanEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanEntryStatus::Scheduled => write!(f, "scheduled"),
            PlanEntryStatus::InProgress => write!(f, "in_progress"),
            PlanEntryStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for PlanEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(PlanEntryStatus::Scheduled),
            "in_progress" => Ok(PlanEntryStatus::InProgress),
            "completed" => Ok(PlanEntryStatus::Completed),
            other => Err(format!("未知的排产明细状态: {}", other)),
        }
    }
}
