// ==========================================
// 销售订单排产系统 - 物料需求计算引擎
// ==========================================
// 职责: 按批次总量展开产品 BOM,生成物料需求报告
// 约定: 产品无 BOM 数据时返回空需求列表（正常态,非错误）;
//       "批次不存在"才是 NotFound
// ==========================================

use crate::domain::bom::{BatchRequirement, RequirementItem};
use crate::repository::batch_repo::BatchRepository;
use crate::repository::bom_repo::BomRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::plan_entry_repo::PlanEntryRepository;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::instrument;

// ==========================================
// RequirementCalculator - 物料需求计算引擎
// ==========================================
pub struct RequirementCalculator {
    conn: Arc<Mutex<Connection>>,
}

impl RequirementCalculator {
    /// 构造函数
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算批次物料需求
    ///
    /// total_required = quantity_per_unit × batch.total_quantity（保留2位小数）,
    /// 需求明细按 BOM 插入顺序返回。
    ///
    /// # 返回
    /// - `Ok(Some(report))`: 批次存在（BOM 为空时 requirements 为空列表）
    /// - `Ok(None)`: 批次不存在
    #[instrument(skip(self))]
    pub fn batch_requirement(&self, batch_id: i64) -> RepositoryResult<Option<BatchRequirement>> {
        let conn = self.get_conn()?;
        Self::batch_requirement_on(&conn, batch_id)
    }

    /// 一组排产明细覆盖的批次需求（按批次去重,保持明细顺序）
    pub fn requirements_for_entries(
        &self,
        entry_ids: &[i64],
    ) -> RepositoryResult<Vec<BatchRequirement>> {
        let conn = self.get_conn()?;

        let mut seen: HashSet<i64> = HashSet::new();
        let mut result = Vec::new();
        for &entry_id in entry_ids {
            let entry = match PlanEntryRepository::find_by_id_on(&conn, entry_id)? {
                Some(e) => e,
                None => continue,
            };
            let batch_id = match entry.batch_id {
                Some(id) => id,
                None => continue, // 历史/手工行无批次
            };
            if !seen.insert(batch_id) {
                continue;
            }
            if let Some(req) = Self::batch_requirement_on(&conn, batch_id)? {
                result.push(req);
            }
        }
        Ok(result)
    }

    // ==========================================
    // 事务内关联函数
    // ==========================================

    /// 计算批次物料需求（事务内可用）
    pub fn batch_requirement_on(
        conn: &Connection,
        batch_id: i64,
    ) -> RepositoryResult<Option<BatchRequirement>> {
        let batch = match BatchRepository::find_by_id_on(conn, batch_id)? {
            Some(b) => b,
            None => return Ok(None),
        };

        let mut requirements = Vec::new();
        if let Some(product) = BomRepository::find_product_by_name_on(conn, &batch.product_name)? {
            for (line, material) in BomRepository::bom_lines_for_product_on(conn, product.id)? {
                let total = line.quantity_per_unit * batch.total_quantity as f64;
                requirements.push(RequirementItem {
                    raw_material_name: material.name,
                    unit: material.unit,
                    quantity_per_unit: line.quantity_per_unit,
                    total_required: round2(total),
                });
            }
        }

        Ok(Some(BatchRequirement {
            batch_id: batch.id,
            product_name: batch.product_name,
            color: batch.color,
            total_quantity: batch.total_quantity,
            requirements,
        }))
    }
}

/// 四舍五入到2位小数
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn seed_batch(conn: &Arc<Mutex<Connection>>, product: &str, color: &str, qty: i64) -> i64 {
        let guard = conn.lock().unwrap();
        BatchRepository::insert_on(&guard, product, color, qty, &["O1".to_string()])
            .unwrap()
            .id
    }

    #[test]
    fn test_requirement_math() {
        // 100 件 × 0.5 kg/件 = 50.0 kg
        let conn = setup();
        let batch_id = seed_batch(&conn, "Chair", "Red", 100);
        {
            let repo = BomRepository::new(conn.clone());
            let product = repo.insert_product("Chair").unwrap();
            let fabric = repo.insert_material("Fabric", "kg").unwrap();
            repo.upsert_bom_line(product.id, fabric.id, 0.5).unwrap();
        }

        let calc = RequirementCalculator::new(conn.clone());
        let report = calc.batch_requirement(batch_id).unwrap().unwrap();

        assert_eq!(report.total_quantity, 100);
        assert_eq!(report.requirements.len(), 1);
        assert_eq!(report.requirements[0].raw_material_name, "Fabric");
        assert_eq!(report.requirements[0].unit, "kg");
        assert_eq!(report.requirements[0].total_required, 50.0);
    }

    #[test]
    fn test_requirement_rounding_and_order() {
        let conn = setup();
        let batch_id = seed_batch(&conn, "Chair", "Red", 3);
        {
            let repo = BomRepository::new(conn.clone());
            let product = repo.insert_product("Chair").unwrap();
            let fabric = repo.insert_material("Fabric", "kg").unwrap();
            let screws = repo.insert_material("Screws", "pcs").unwrap();
            repo.upsert_bom_line(product.id, fabric.id, 0.333).unwrap();
            repo.upsert_bom_line(product.id, screws.id, 12.0).unwrap();
        }

        let calc = RequirementCalculator::new(conn.clone());
        let report = calc.batch_requirement(batch_id).unwrap().unwrap();

        // BOM 插入顺序保持
        assert_eq!(report.requirements[0].raw_material_name, "Fabric");
        assert_eq!(report.requirements[1].raw_material_name, "Screws");
        assert_eq!(report.requirements[0].total_required, 1.0); // 0.999 → 1.00
        assert_eq!(report.requirements[1].total_required, 36.0);
    }

    #[test]
    fn test_remap_updates_quantity_instead_of_duplicating() {
        let conn = setup();
        let batch_id = seed_batch(&conn, "Chair", "Red", 10);
        {
            let repo = BomRepository::new(conn.clone());
            let product = repo.insert_product("Chair").unwrap();
            let fabric = repo.insert_material("Fabric", "kg").unwrap();
            repo.upsert_bom_line(product.id, fabric.id, 0.5).unwrap();
            repo.upsert_bom_line(product.id, fabric.id, 0.8).unwrap(); // 重复映射 → 更新
        }

        let calc = RequirementCalculator::new(conn.clone());
        let report = calc.batch_requirement(batch_id).unwrap().unwrap();
        assert_eq!(report.requirements.len(), 1);
        assert_eq!(report.requirements[0].quantity_per_unit, 0.8);
    }

    #[test]
    fn test_no_bom_yields_empty_list_not_error() {
        let conn = setup();
        let batch_id = seed_batch(&conn, "Chair", "Red", 100);

        let calc = RequirementCalculator::new(conn.clone());
        let report = calc.batch_requirement(batch_id).unwrap().unwrap();
        assert!(report.requirements.is_empty());
    }

    #[test]
    fn test_unknown_batch_is_none() {
        let conn = setup();
        let calc = RequirementCalculator::new(conn.clone());
        assert!(calc.batch_requirement(9999).unwrap().is_none());
    }
}
