// ==========================================
// 销售订单排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod bom;
pub mod machine;
pub mod order;
pub mod plan;
pub mod types;

// 重导出核心类型
pub use batch::ConsolidatedBatch;
pub use bom::{BatchRequirement, BomLine, Product, RawMaterial, RequirementItem};
pub use machine::{Machine, MachineUpdate};
pub use order::{NewSalesOrder, SalesOrder};
pub use plan::PlanEntry;
pub use types::{OrderStatus, PlanEntryStatus};
