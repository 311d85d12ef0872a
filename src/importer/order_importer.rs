// ==========================================
// 销售订单排产系统 - 订单导入器
// ==========================================
// 职责: 解析订单文件 → 行级校验 → 写入订单台账
// 约定: 行级容错: 合法行落库,问题行逐条记入 errors,不整体失败
// 必需列: Order ID / Product Name / Quantity / Color
// 可选列: Delivery Date (缺失或非法时取当天), Notes
// ==========================================

use crate::domain::order::NewSalesOrder;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::repository::error::RepositoryError;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// 必需列
const REQUIRED_COLUMNS: [&str; 4] = ["Order ID", "Product Name", "Quantity", "Color"];

/// 产品名缺失时的兜底值
const FALLBACK_PRODUCT: &str = "Unknown";
/// 颜色缺失时的兜底值
const FALLBACK_COLOR: &str = "Default";

// ==========================================
// ImportOutcome - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub import_id: String,        // 本次导入的运行ID (uuid)
    pub created: usize,           // 成功落库行数
    pub errors: Vec<String>,      // 行级错误信息
}

// ==========================================
// Trait: OrderImporter
// ==========================================
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// 从文件导入订单
    async fn import_orders(&self, file_path: &Path) -> ImportResult<ImportOutcome>;
}

// ==========================================
// OrderImporterImpl - 订单导入器实现
// ==========================================
pub struct OrderImporterImpl {
    order_repo: Arc<OrderRepository>,
}

impl OrderImporterImpl {
    /// 构造函数
    pub fn new(order_repo: Arc<OrderRepository>) -> Self {
        Self { order_repo }
    }

    /// 校验表头必需列
    fn check_columns(record: &RawRecord) -> ImportResult<()> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !record.contains_key(**c))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let mut found: Vec<&str> = record.keys().map(|k| k.as_str()).collect();
        found.sort_unstable();
        Err(ImportError::MissingColumns {
            missing: missing.join(", "),
            found: found.join(", "),
        })
    }

    /// 解析单行为订单输入
    ///
    /// 返回 Ok(None) 表示该行应静默跳过（无订单号）
    fn parse_row(record: &RawRecord, today: NaiveDate) -> Result<Option<NewSalesOrder>, String> {
        let order_no = record
            .get("Order ID")
            .map(|s| s.trim())
            .unwrap_or_default();
        if order_no.is_empty() {
            return Ok(None);
        }

        let product_name = match record.get("Product Name").map(|s| s.trim()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => FALLBACK_PRODUCT.to_string(),
        };
        let color = match record.get("Color").map(|s| s.trim()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => FALLBACK_COLOR.to_string(),
        };

        // 数量: 接受 "30" / "30.0" 两种写法; 非正数拒绝
        let quantity_raw = record.get("Quantity").map(|s| s.trim()).unwrap_or_default();
        let quantity = quantity_raw
            .parse::<f64>()
            .map_err(|_| format!("行 {}: 数量非法 '{}'", order_no, quantity_raw))?
            as i64;
        if quantity <= 0 {
            return Err(format!("行 {}: 数量必须为正数, 实际 {}", order_no, quantity));
        }

        // 交期: 取前10位按 ISO 解析,缺失/非法取当天
        let delivery_date = record
            .get("Delivery Date")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .unwrap_or(today);

        let notes = record
            .get("Notes")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(Some(NewSalesOrder {
            order_no: order_no.to_string(),
            product_name,
            color,
            quantity,
            delivery_date,
            notes,
        }))
    }
}

#[async_trait]
impl OrderImporter for OrderImporterImpl {
    #[instrument(skip(self), fields(path = %file_path.display()))]
    async fn import_orders(&self, file_path: &Path) -> ImportResult<ImportOutcome> {
        let import_id = Uuid::new_v4().to_string();
        let records = UniversalFileParser::parse(file_path)?;

        let mut outcome = ImportOutcome {
            import_id: import_id.clone(),
            created: 0,
            errors: Vec::new(),
        };
        if records.is_empty() {
            return Ok(outcome);
        }
        Self::check_columns(&records[0])?;

        let today = Local::now().date_naive();
        let mut seen_in_file: HashSet<(String, String, String)> = HashSet::new();

        for record in &records {
            let order = match Self::parse_row(record, today) {
                Ok(Some(o)) => o,
                Ok(None) => continue,
                Err(msg) => {
                    outcome.errors.push(msg);
                    continue;
                }
            };

            let line_key = (
                order.order_no.clone(),
                order.product_name.clone(),
                order.color.clone(),
            );
            if !seen_in_file.insert(line_key) {
                outcome.errors.push(format!(
                    "重复行项目: {} ({} - {})",
                    order.order_no, order.product_name, order.color
                ));
                continue;
            }

            match self.order_repo.insert(&order) {
                Ok(_) => outcome.created += 1,
                Err(RepositoryError::UniqueConstraintViolation(_)) => {
                    outcome.errors.push(format!(
                        "重复行项目: {} ({} - {})",
                        order.order_no, order.product_name, order.color
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            import_id = %import_id,
            created = outcome.created,
            errors = outcome.errors.len(),
            "订单导入完成"
        );
        Ok(outcome)
    }
}
