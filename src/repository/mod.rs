// ==========================================
// 故障知识库 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod dashboard_repo;
pub mod entry_import_repo;
pub mod entry_repo;
pub mod equipment_repo;
pub mod error;
pub mod search_repo;
pub mod sql_util;
pub mod topic_repo;

// 重导出核心仓储
pub use dashboard_repo::DashboardRepository;
pub use entry_import_repo::{EntryImportRepository, EntryImportSink};
pub use entry_repo::EntryRepository;
pub use equipment_repo::EquipmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use search_repo::SearchRepository;
pub use topic_repo::TopicRepository;
