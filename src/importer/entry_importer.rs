// ==========================================
// 故障知识库 - 条目导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 映射校验 → 解析 → 事务内逐行执行 → 删除临时文件
// ==========================================

use crate::config::ImportLimits;
use crate::domain::import::{ColumnMapping, FilePreview, ImportSummary};
use crate::importer::entry_importer_trait::{EntryImporter, FileParser};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::import_executor::ImportExecutor;
use crate::perf::PerfGuard;
use crate::repository::entry_import_repo::EntryImportRepository;
use async_trait::async_trait;
use chrono::Local;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// EntryImporterImpl - 条目导入器实现
// ==========================================
pub struct EntryImporterImpl {
    // 数据访问层
    import_repo: EntryImportRepository,

    // 导入组件
    file_parser: Box<dyn FileParser>,

    limits: ImportLimits,
}

impl EntryImporterImpl {
    /// 创建新的 EntryImporter 实例
    ///
    /// # 参数
    /// - import_repo: 导入数据仓储
    /// - limits: 预览行数 / 错误上限 / 标题回退长度
    pub fn new(import_repo: EntryImportRepository, limits: ImportLimits) -> Self {
        Self {
            import_repo,
            file_parser: Box::new(UniversalFileParser),
            limits,
        }
    }

    fn run(&self, file_path: &Path, mapping: &ColumnMapping) -> ImportResult<ImportSummary> {
        // 映射校验先于任何行
        let executor = ImportExecutor::new(mapping, self.limits, Local::now().date_naive())?;

        let table = self.file_parser.parse(file_path)?;
        info!(
            total_rows = table.total_rows(),
            mapped_fields = ?mapping.mapped_fields(),
            "文件解析完成，开始写入"
        );

        let summary = self
            .import_repo
            .run_import(|sink| executor.execute(&table.rows, sink))?;
        Ok(summary)
    }
}

/// 删除临时上传文件（失败只告警）
pub fn remove_upload(file_path: &Path) {
    match std::fs::remove_file(file_path) {
        Ok(()) => debug!(file = %file_path.display(), "临时文件已删除"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(file = %file_path.display(), error = %e, "临时文件删除失败"),
    }
}

#[async_trait]
impl EntryImporter for EntryImporterImpl {
    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    async fn preview(&self, file_path: &Path) -> ImportResult<FilePreview> {
        let _perf = PerfGuard::new("import_preview");

        let table = self.file_parser.parse(file_path)?;
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!(columns = table.columns.len(), total_rows = table.total_rows(), "预览生成");
        Ok(table.preview(self.limits.preview_rows, &file_name))
    }

    #[instrument(skip(self, file_path, mapping), fields(file = %file_path.display()))]
    async fn execute(&self, file_path: &Path, mapping: &ColumnMapping) -> ImportResult<ImportSummary> {
        let _perf = PerfGuard::new("import_execute");
        info!("开始导入条目");

        let result = self.run(file_path, mapping);

        // 无论成败均删除临时文件
        remove_upload(file_path);

        match &result {
            Ok(summary) => info!(
                imported = summary.imported,
                skipped = summary.skipped,
                error_messages = summary.errors.len(),
                "导入完成"
            ),
            Err(e) => warn!(error = %e, "导入失败"),
        }
        result
    }
}
