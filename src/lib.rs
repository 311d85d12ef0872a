// ==========================================
// 销售订单排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单合并 / 产能排程 / 物料需求
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测（SQL 计数 + 慢查询日志）
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与入口状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderStatus, PlanEntryStatus};

// 领域实体
pub use domain::{
    BatchRequirement, BomLine, ConsolidatedBatch, Machine, PlanEntry, Product, RawMaterial,
    RequirementItem, SalesOrder,
};

// 引擎
pub use engine::{
    CapacityManager, ConsolidationEngine, ProductionScheduler, RequirementCalculator,
    StatusReconciler,
};

// API
pub use api::{
    ConsolidationApi, DashboardApi, ImportApi, MachineApi, MaterialApi, OrderApi, ProductionApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售订单排产系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
