// ==========================================
// 故障知识库 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级错误不走此类型（记录在 ImportSummary.errors 中），
//       此处只包含整批失败的错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("Unsupported file format: .{ext}. Use .csv, .xlsx, or .xls")]
    UnsupportedFormat { ext: String },

    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件过大: {size} 字节（上限 {limit} 字节）")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("文件解析失败: {0}")]
    ParseFailure(String),

    #[error("上传路径不在上传目录内: {0}")]
    PathOutsideUploadDir(String),

    // ===== 映射错误 =====
    #[error("Column mapping must include title or question")]
    MissingMapping,

    // ===== 存储错误 =====
    #[error("导入存储失败，已整体回滚: {0}")]
    StorageFatal(#[source] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    pub fn unsupported(ext: impl Into<String>) -> Self {
        ImportError::UnsupportedFormat { ext: ext.into() }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ParseFailure(format!("CSV: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ParseFailure(format!("workbook: {}", err))
    }
}

// 仓储错误到达导入层时一律视为整批失败（行级错误已在执行器内消化）
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::StorageFatal(err)
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// 行级错误（只记录，不中断整批）
// ==========================================
#[derive(Error, Debug)]
pub enum RowError {
    #[error("invalid {field} value '{value}'")]
    InvalidFieldValue { field: String, value: String },

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl RowError {
    /// 存储错误是否需要升级为整批失败
    pub fn is_fatal(&self) -> bool {
        match self {
            RowError::Storage(e) => e.is_fatal(),
            RowError::InvalidFieldValue { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_names_allowed_extensions() {
        let msg = ImportError::unsupported("txt").to_string();
        assert!(msg.contains(".txt"));
        assert!(msg.contains(".csv"));
        assert!(msg.contains(".xlsx"));
        assert!(msg.contains(".xls"));
    }

    #[test]
    fn test_repository_error_becomes_storage_fatal() {
        let err: ImportError = RepositoryError::LockError("poisoned".into()).into();
        assert!(matches!(err, ImportError::StorageFatal(_)));
    }

    #[test]
    fn test_row_error_fatality_follows_storage() {
        let row: RowError = RepositoryError::UniqueConstraintViolation("dup".into()).into();
        assert!(!row.is_fatal());
        let row: RowError = RepositoryError::ForeignKeyViolation("fk".into()).into();
        assert!(row.is_fatal());
        let row: RowError = RepositoryError::DatabaseBusy("busy".into()).into();
        assert!(row.is_fatal());
    }
}
