// ==========================================
// 销售订单排产系统 - 导入层错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入层错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("缺少必需列: {missing}（实际列: {found}）")]
    MissingColumns { missing: String, found: String },

    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
