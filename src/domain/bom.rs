// ==========================================
// 销售订单排产系统 - 产品与物料清单领域模型
// ==========================================
// 不变式: 同一 (product, raw_material) 至多一条映射,重复映射更新 quantity_per_unit
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,                      // 产品ID
    pub name: String,                 // 产品名称 (唯一)
    pub created_at: NaiveDateTime,    // 创建时间
}

// ==========================================
// RawMaterial - 原材料
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: i64,                      // 原材料ID
    pub name: String,                 // 名称
    pub unit: String,                 // 计量单位 (自由文本, 默认 "kg")
    pub created_at: NaiveDateTime,    // 创建时间
}

// ==========================================
// BomLine - 产品-原材料映射（BOM 行）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    pub id: i64,                      // 映射ID
    pub product_id: i64,              // 产品ID
    pub raw_material_id: i64,         // 原材料ID
    pub quantity_per_unit: f64,       // 单件用量 (正数)
}

// ==========================================
// BatchRequirement - 批次物料需求报告
// ==========================================
// BOM 为空时 requirements 为空列表（正常态,区别于"批次不存在"）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequirement {
    pub batch_id: i64,                // 批次ID
    pub product_name: String,         // 产品名称
    pub color: String,                // 颜色
    pub total_quantity: i64,          // 批次总量
    pub requirements: Vec<RequirementItem>, // 需求明细 (BOM 插入顺序)
}

/// 单条物料需求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementItem {
    pub raw_material_name: String,    // 原材料名称
    pub unit: String,                 // 计量单位
    pub quantity_per_unit: f64,       // 单件用量
    pub total_required: f64,          // 总需求 = 单件用量 × 批次总量 (保留2位小数)
}
