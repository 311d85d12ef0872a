// ==========================================
// 销售订单排产系统 - 销售订单领域模型
// ==========================================
// 红线: 订单只被合并引擎(batch_id/status)与状态推导修改,排产引擎不直接改单
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// SalesOrder - 销售订单（行项目粒度）
// ==========================================
// 同一 order_no 允许多个行项目（产品+颜色不同），(order_no, product, color) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: i64,                      // 内部ID
    pub order_no: String,             // 外部订单号
    pub product_name: String,         // 产品名称
    pub color: String,                // 颜色
    pub quantity: i64,                // 数量 (正整数)
    pub delivery_date: NaiveDate,     // 交货日期
    pub status: OrderStatus,          // 状态
    pub batch_id: Option<i64>,        // 合并标记: 所属批次 (None = 未合并)
    pub notes: Option<String>,        // 备注
    pub created_at: NaiveDateTime,    // 创建时间
}

impl SalesOrder {
    /// 判断是否已并入批次
    pub fn is_consolidated(&self) -> bool {
        self.batch_id.is_some()
    }
}

// ==========================================
// NewSalesOrder - 创建订单的输入
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalesOrder {
    pub order_no: String,
    pub product_name: String,
    pub color: String,
    pub quantity: i64,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
}
