// ==========================================
// 故障知识库 - 导入层
// ==========================================
// 职责: 表格文件批量导入知识条目
// 流程: 解析 → 列映射 → 引用解析 → 事务内逐行写入
// 支持: CSV, Excel (.xlsx/.xls)
// ==========================================

// 模块声明
pub mod entry_importer;
pub mod entry_importer_trait;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_executor;
pub mod reference_resolver;

// 重导出核心类型
pub use entry_importer::{remove_upload, EntryImporterImpl};
pub use error::{ImportError, ImportResult, RowError};
pub use field_mapper::{ExtractedRow, FieldMapper};
pub use file_parser::{CsvParser, ExcelParser, SourceFormat, UniversalFileParser};
pub use import_executor::{ImportExecutor, RowOutcome};
pub use reference_resolver::ReferenceResolver;

// 重导出 Trait 接口
pub use entry_importer_trait::{EntryImporter, FileParser};
