// ==========================================
// 故障知识库 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、读模型
// 红线: 不含数据访问逻辑
// ==========================================

pub mod dashboard;
pub mod entry;
pub mod import;
pub mod reference;
pub mod search;
pub mod types;

// 重导出核心类型
pub use dashboard::{BreakdownItem, DailyCount, DashboardStats, FrequentIssue, TrendReport};
pub use entry::{
    EntryDetail, EntryInput, EntryListQuery, EntryPage, EntryPatch, EntrySummary, NewEntry,
    Occurrence,
};
pub use import::{ColumnMapping, FilePreview, ImportSummary, LogicalField, ParsedTable, RawRow};
pub use reference::{
    Equipment, EquipmentInput, ReferenceKind, Topic, TopicInput, DEFAULT_TOPIC_COLOR,
};
pub use search::{snippet, SearchHit, SearchQuery, SearchResults};
pub use types::{Severity, SortOrder, Trend};
