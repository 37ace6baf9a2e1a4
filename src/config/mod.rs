// ==========================================
// 故障知识库 - 配置层
// ==========================================
// 职责: 应用配置（环境变量）+ 导入限额
// ==========================================

pub mod app_config;
pub mod import_limits;

// 重导出核心配置
pub use app_config::{default_db_path, default_upload_dir, AppConfig};
pub use import_limits::ImportLimits;
