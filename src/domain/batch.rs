// ==========================================
// 销售订单排产系统 - 生产批次领域模型
// ==========================================
// 红线: 批次只由合并引擎创建; remaining_quantity 只由排产引擎递减
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ConsolidatedBatch - 合并批次
// ==========================================
// 不变式: total_quantity == 贡献订单数量之和
//         remaining_quantity ∈ [0, total_quantity]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedBatch {
    pub id: i64,                      // 批次ID
    pub product_name: String,         // 产品名称
    pub color: String,                // 颜色
    pub total_quantity: i64,          // 合并总量
    pub remaining_quantity: i64,      // 未排产余量 (初始 = total_quantity)
    pub order_nos: Vec<String>,       // 贡献订单号 (按合并时遇到的顺序)
    pub created_at: NaiveDateTime,    // 创建时间
}

impl ConsolidatedBatch {
    /// 判断是否已全部排产
    pub fn is_fully_planned(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// 贡献订单号的存储格式（逗号拼接）
    pub fn order_nos_joined(&self) -> String {
        self.order_nos.join(",")
    }

    /// 从存储格式解析贡献订单号
    pub fn split_order_nos(raw: &str) -> Vec<String> {
        raw.split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}
