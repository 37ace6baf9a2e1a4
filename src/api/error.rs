// ==========================================
// 故障知识库 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/导入错误转换为带状态码的用户可读错误
// 约束: 行级导入错误不会到达这里（记录在 ImportSummary.errors 中）
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误 (400)
    // ==========================================
    #[error("{0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("引用不存在: {0}")]
    InvalidReference(String),

    /// 导入被整体拒绝（格式 / 映射 / 解析 / 路径）
    #[error("{0}")]
    ImportRejected(String),

    // ==========================================
    // 资源错误 (404 / 409 / 413)
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    // ==========================================
    // 服务端错误 (500)
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定的机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidReference(_) => "INVALID_REFERENCE",
            ApiError::ImportRejected(_) => "IMPORT_REJECTED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::ImportError(_) => "IMPORT_FAILED",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::InvalidReference(_)
            | ApiError::ImportRejected(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::ImportError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{}(id={})不存在", entity, id))
    }

    /// 响应体 `{code, error}`
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "error": self.to_string(),
        })
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::ForeignKeyViolation(msg) => ApiError::InvalidReference(msg),
            RepositoryError::CheckConstraintViolation(msg)
            | RepositoryError::ConstraintViolation(msg) => ApiError::ValidationError(msg),
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),

            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseBusy(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库忙: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::StorageFailure(msg) | RepositoryError::DatabaseQueryError(msg) => {
                ApiError::DatabaseError(msg)
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ImportError::UnsupportedFormat { .. }
            | ImportError::FileNotFound(_)
            | ImportError::ParseFailure(_)
            | ImportError::PathOutsideUploadDir(_)
            | ImportError::MissingMapping => ApiError::ImportRejected(err.to_string()),
            ImportError::FileReadError(_) | ImportError::StorageFatal(_) => {
                ApiError::ImportError(err.to_string())
            }
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
