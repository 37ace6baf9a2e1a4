// ==========================================
// 故障知识库 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 功能: 条目管理 / 批量导入 / 检索 / 统计看板
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 表格批量导入
pub mod importer;

// 配置层 - 环境配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::{ApiError, ApiResult};
pub use app::AppState;
pub use config::AppConfig;
pub use domain::{ColumnMapping, FilePreview, ImportSummary, Severity};

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "troubleshoot-kb";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
