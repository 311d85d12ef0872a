// ==========================================
// 销售订单排产系统 - 导入API
// ==========================================
// 职责: 封装订单文件导入,供上层入口调用
// ==========================================

use crate::api::error::ApiResult;
use crate::importer::order_importer::{ImportOutcome, OrderImporter};
use std::path::Path;
use std::sync::Arc;

// ==========================================
// ImportApi - 导入API
// ==========================================
pub struct ImportApi {
    importer: Arc<dyn OrderImporter>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(importer: Arc<dyn OrderImporter>) -> Self {
        Self { importer }
    }

    /// 从文件导入订单（Excel/CSV）
    ///
    /// 行级容错: 合法行落库,问题行逐条回报
    pub async fn import_orders<P: AsRef<Path>>(&self, file_path: P) -> ApiResult<ImportOutcome> {
        Ok(self.importer.import_orders(file_path.as_ref()).await?)
    }
}
