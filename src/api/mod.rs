// ==========================================
// 故障知识库 - API 层
// ==========================================
// 职责: 与传输无关的业务 API，请求/响应结构对应 REST 接口
// ==========================================

pub mod dashboard_api;
pub mod entry_api;
pub mod error;
pub mod import_api;
pub mod reference_api;

// 重导出核心类型
pub use dashboard_api::{DashboardApi, SearchApi};
pub use entry_api::{EntryApi, OccurrenceInput};
pub use error::{ApiError, ApiResult};
pub use import_api::{ExecuteRequest, ImportApi, UploadPreview};
pub use reference_api::{EquipmentApi, TopicApi};
