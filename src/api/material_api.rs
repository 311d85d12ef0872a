// ==========================================
// 销售订单排产系统 - 原材料/产品/BOM API
// ==========================================
// 职责: 原材料与产品登记、BOM 映射维护、批次物料需求查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::bom::{BatchRequirement, BomLine, Product, RawMaterial};
use crate::engine::requirement::RequirementCalculator;
use crate::repository::bom_repo::BomRepository;
use std::sync::Arc;

/// 计量单位缺省值
const DEFAULT_UNIT: &str = "kg";

// ==========================================
// MaterialApi - 原材料/产品/BOM API
// ==========================================
pub struct MaterialApi {
    bom_repo: Arc<BomRepository>,
    requirement_calc: Arc<RequirementCalculator>,
}

impl MaterialApi {
    /// 创建新的MaterialApi实例
    pub fn new(bom_repo: Arc<BomRepository>, requirement_calc: Arc<RequirementCalculator>) -> Self {
        Self {
            bom_repo,
            requirement_calc,
        }
    }

    // ==========================================
    // 原材料
    // ==========================================

    /// 创建原材料（unit 为空时取 "kg"）
    pub fn create_material(&self, name: &str, unit: Option<&str>) -> ApiResult<RawMaterial> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("原材料名称不能为空".to_string()));
        }
        let unit = match unit.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => DEFAULT_UNIT,
        };
        Ok(self.bom_repo.insert_material(name.trim(), unit)?)
    }

    /// 查询全部原材料
    pub fn list_materials(&self) -> ApiResult<Vec<RawMaterial>> {
        Ok(self.bom_repo.list_materials()?)
    }

    // ==========================================
    // 产品
    // ==========================================

    /// 创建产品（名称唯一）
    pub fn create_product(&self, name: &str) -> ApiResult<Product> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品名称不能为空".to_string()));
        }
        if self.bom_repo.find_product_by_name(name.trim())?.is_some() {
            return Err(ApiError::ValidationError(format!(
                "产品已存在: {}",
                name.trim()
            )));
        }
        Ok(self.bom_repo.insert_product(name.trim())?)
    }

    /// 查询全部产品
    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.bom_repo.list_products()?)
    }

    // ==========================================
    // BOM 映射
    // ==========================================

    /// 建立/更新产品-原材料映射
    ///
    /// 同一 (product, raw_material) 重复映射时更新单件用量而非新增
    pub fn map_material(
        &self,
        product_id: i64,
        raw_material_id: i64,
        quantity_per_unit: f64,
    ) -> ApiResult<BomLine> {
        if !(quantity_per_unit > 0.0) {
            return Err(ApiError::ValidationError(format!(
                "单件用量必须为正数, 实际 {}",
                quantity_per_unit
            )));
        }
        if self.bom_repo.find_product_by_id(product_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Product(id={})不存在",
                product_id
            )));
        }
        if self.bom_repo.find_material_by_id(raw_material_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "RawMaterial(id={})不存在",
                raw_material_id
            )));
        }
        Ok(self
            .bom_repo
            .upsert_bom_line(product_id, raw_material_id, quantity_per_unit)?)
    }

    // ==========================================
    // 物料需求
    // ==========================================

    /// 批次物料需求报告（BOM 未定义时返回空需求列表,批次不存在才报 NotFound）
    pub fn batch_requirement(&self, batch_id: i64) -> ApiResult<BatchRequirement> {
        self.requirement_calc
            .batch_requirement(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ConsolidatedBatch(id={})不存在", batch_id)))
    }

    /// 一组排产明细覆盖的批次需求（按批次去重）
    pub fn requirements_for_entries(&self, entry_ids: &[i64]) -> ApiResult<Vec<BatchRequirement>> {
        Ok(self.requirement_calc.requirements_for_entries(entry_ids)?)
    }
}
