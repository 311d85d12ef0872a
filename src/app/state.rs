// ==========================================
// 销售订单排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 装配顺序: 连接 → Repository → Engine → API
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    ConsolidationApi, DashboardApi, ImportApi, MachineApi, MaterialApi, OrderApi, ProductionApi,
};
use crate::db;
use crate::engine::{
    CapacityManager, ConsolidationEngine, ProductionScheduler, RequirementCalculator,
};
use crate::importer::OrderImporterImpl;
use crate::perf;
use crate::repository::{
    BatchRepository, BomRepository, MachineRepository, OrderRepository, PlanEntryRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 合并API
    pub consolidation_api: Arc<ConsolidationApi>,

    /// 排产API
    pub production_api: Arc<ProductionApi>,

    /// 机台API
    pub machine_api: Arc<MachineApi>,

    /// 原材料/产品/BOM API
    pub material_api: Arc<MaterialApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 订单导入API
    pub import_api: Arc<ImportApi>,

    /// 产能管理器（读路径直接可用）
    pub capacity_manager: Arc<CapacityManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并应用统一 PRAGMA / SQL 观测
    /// 2. 幂等建表
    /// 3. 初始化 Repository / Engine / API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        perf::install_sqlite_tracing(&mut conn);
        db::init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let plan_entry_repo = Arc::new(PlanEntryRepository::new(conn.clone()));
        let machine_repo = Arc::new(MachineRepository::new(conn.clone()));
        let bom_repo = Arc::new(BomRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let consolidation_engine = Arc::new(ConsolidationEngine::new(conn.clone()));
        let scheduler = Arc::new(ProductionScheduler::new(conn.clone()));
        let requirement_calc = Arc::new(RequirementCalculator::new(conn.clone()));
        let capacity_manager = Arc::new(CapacityManager::new(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let order_api = Arc::new(OrderApi::new(order_repo.clone(), plan_entry_repo.clone()));
        let consolidation_api = Arc::new(ConsolidationApi::new(
            consolidation_engine,
            batch_repo.clone(),
        ));
        let production_api = Arc::new(ProductionApi::new(
            scheduler,
            plan_entry_repo.clone(),
            batch_repo.clone(),
        ));
        let machine_api = Arc::new(MachineApi::new(machine_repo));
        let material_api = Arc::new(MaterialApi::new(bom_repo, requirement_calc));
        let dashboard_api = Arc::new(DashboardApi::new(
            order_api.clone(),
            production_api.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(Arc::new(OrderImporterImpl::new(
            order_repo,
        ))));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            order_api,
            consolidation_api,
            production_api,
            machine_api,
            material_api,
            dashboard_api,
            import_api,
            capacity_manager,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/order-planning-aps-dev/order_planning_aps.db
/// - 生产环境: 用户数据目录/order-planning-aps/order_planning_aps.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("ORDER_PLANNING_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 拿不到用户数据目录时回退到当前目录
    let mut path = PathBuf::from("./order_planning_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("order-planning-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("order-planning-aps");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("order_planning_aps.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_over_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.get_db_path(), db_path);

        // 基础链路: 建机台 → 列机台
        let machine = state.machine_api.create("Line A", 40).unwrap();
        let machines = state.machine_api.list().unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].id, machine.id);
    }
}
