// ==========================================
// 销售订单排产系统 - 机台API
// ==========================================
// 职责: 机台增查改 + 软停用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::machine::{Machine, MachineUpdate};
use crate::repository::machine_repo::MachineRepository;
use std::sync::Arc;

// ==========================================
// MachineApi - 机台API
// ==========================================
pub struct MachineApi {
    machine_repo: Arc<MachineRepository>,
}

impl MachineApi {
    /// 创建新的MachineApi实例
    pub fn new(machine_repo: Arc<MachineRepository>) -> Self {
        Self { machine_repo }
    }

    /// 创建机台
    pub fn create(&self, name: &str, capacity_per_day: i64) -> ApiResult<Machine> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("机台名称不能为空".to_string()));
        }
        if capacity_per_day <= 0 {
            return Err(ApiError::ValidationError(format!(
                "日产能必须为正数, 实际 {}",
                capacity_per_day
            )));
        }
        Ok(self.machine_repo.insert(name.trim(), capacity_per_day)?)
    }

    /// 查询启用中的机台
    pub fn list(&self) -> ApiResult<Vec<Machine>> {
        Ok(self.machine_repo.list_active()?)
    }

    /// 按ID查询机台
    pub fn get(&self, id: i64) -> ApiResult<Machine> {
        self.machine_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Machine(id={})不存在", id)))
    }

    /// 部分更新机台
    pub fn update(&self, id: i64, update: &MachineUpdate) -> ApiResult<Machine> {
        if let Some(capacity) = update.capacity_per_day {
            if capacity <= 0 {
                return Err(ApiError::ValidationError(format!(
                    "日产能必须为正数, 实际 {}",
                    capacity
                )));
            }
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ApiError::InvalidInput("机台名称不能为空".to_string()));
            }
        }
        Ok(self.machine_repo.update(id, update)?)
    }

    /// 停用机台（软删除; 停用后不再参与排产）
    pub fn deactivate(&self, id: i64) -> ApiResult<()> {
        Ok(self.machine_repo.deactivate(id)?)
    }
}
