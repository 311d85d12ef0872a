// ==========================================
// 销售订单排产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供入口(CLI/服务)调用
// ==========================================

pub mod consolidation_api;
pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod machine_api;
pub mod material_api;
pub mod order_api;
pub mod production_api;

// 重导出核心类型
pub use consolidation_api::ConsolidationApi;
pub use dashboard_api::{DashboardApi, DashboardStats};
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
pub use machine_api::MachineApi;
pub use material_api::MaterialApi;
pub use order_api::{OrderApi, OrderView};
pub use production_api::{PlanEntryView, ProductionApi};
