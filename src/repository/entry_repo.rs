// ==========================================
// 故障知识库 - 知识条目数据仓储
// ==========================================
// 表: entries / entry_tags / occurrence_log
// 红线: Repository 不做业务校验，只做数据映射
// ==========================================

mod core;
mod queries;


pub use self::core::EntryRepository;
pub(crate) use self::queries::{attach_tags, map_entry_row, ENTRY_SELECT};
