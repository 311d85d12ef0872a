// ==========================================
// 销售订单排产系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL; 写操作整体成功或整体回滚
// ==========================================

pub mod capacity;
pub mod consolidation;
pub mod requirement;
pub mod scheduler;
pub mod status;

// 重导出核心引擎
pub use capacity::CapacityManager;
pub use consolidation::{ConsolidationEngine, ResetSummary};
pub use requirement::RequirementCalculator;
pub use scheduler::ProductionScheduler;
pub use status::{BatchPlanProgress, StatusReconciler};
