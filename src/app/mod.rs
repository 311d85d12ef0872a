// ==========================================
// 销售订单排产系统 - 应用层
// ==========================================
// 职责: 装配应用状态,提供入口辅助
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
