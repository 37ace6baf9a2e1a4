// ==========================================
// 故障知识库 - 条目导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::domain::import::{ColumnMapping, FilePreview, ImportSummary, ParsedTable};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// EntryImporter Trait
// ==========================================
// 用途: 批量导入主接口（预览 + 执行）
// 实现者: EntryImporterImpl
#[async_trait]
pub trait EntryImporter: Send + Sync {
    /// 解析文件并生成预览
    ///
    /// # 参数
    /// - file_path: 已上传的文件路径（.csv/.xlsx/.xls）
    ///
    /// # 返回
    /// - Ok(FilePreview): 列清单 + 前几行 + 总行数
    /// - Err: UnsupportedFormat / ParseFailure / FileNotFound
    async fn preview(&self, file_path: &Path) -> ImportResult<FilePreview>;

    /// 按列映射执行导入
    ///
    /// # 参数
    /// - file_path: 已上传的文件路径
    /// - mapping: 用户确认的列映射
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入汇总（行级错误在 errors 中）
    /// - Err: MissingMapping / 文件错误 / StorageFatal（无任何写入）
    ///
    /// # 说明
    /// - 执行后删除临时文件（无论成败）
    async fn execute(&self, file_path: &Path, mapping: &ColumnMapping) -> ImportResult<ImportSummary>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为表格（列清单 + 行记录）
    ///
    /// # 返回
    /// - Ok(ParsedTable): 每行包含全部列，空单元格为 ""
    /// - Err: UnsupportedFormat（读取前判定）/ FileNotFound / ParseFailure
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable>;
}
