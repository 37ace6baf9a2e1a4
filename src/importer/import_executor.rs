// ==========================================
// 故障知识库 - 导入执行器
// ==========================================
// 流程（逐行，严格按文件顺序，行号从 1 开始、不含表头）:
// 1. 字段提取（title/question 均空 → 跳过，不记消息）
// 2. 引用解析（设备 / 主题，本次运行内缓存）
// 3. 写入条目 + 标签
// 4. 汇总: imported / skipped / errors（上限 N 条）
// 行级错误只记录；致命存储错误直接返回，由调用方整体回滚
// ==========================================

use crate::config::ImportLimits;
use crate::domain::entry::NewEntry;
use crate::domain::import::{ColumnMapping, ImportSummary, RawRow};
use crate::domain::reference::ReferenceKind;
use crate::importer::error::{ImportError, ImportResult, RowError};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::reference_resolver::ReferenceResolver;
use crate::repository::entry_import_repo::EntryImportSink;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Imported(i64),
    Skipped,
    Failed(String),
}

/// 汇总累加器
struct SummaryBuilder {
    summary: ImportSummary,
    max_errors: usize,
}

impl SummaryBuilder {
    fn new(max_errors: usize) -> Self {
        Self {
            summary: ImportSummary::default(),
            max_errors,
        }
    }

    fn record(&mut self, row_number: usize, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Imported(_) => self.summary.imported += 1,
            RowOutcome::Skipped => self.summary.skipped += 1,
            RowOutcome::Failed(message) => {
                self.summary.skipped += 1;
                tracing::warn!(row = row_number, error = %message, "行导入失败");
                if self.summary.errors.len() < self.max_errors {
                    self.summary
                        .errors
                        .push(format!("Row {}: {}", row_number, message));
                }
            }
        }
    }
}

pub struct ImportExecutor<'a> {
    mapper: FieldMapper<'a>,
    limits: ImportLimits,
}

impl<'a> ImportExecutor<'a> {
    /// 创建执行器（映射校验在处理任何行之前完成）
    ///
    /// # 返回
    /// - Err(MissingMapping): title 与 question 均未映射
    pub fn new(
        mapping: &'a ColumnMapping,
        limits: ImportLimits,
        today: NaiveDate,
    ) -> ImportResult<Self> {
        if !FieldMapper::has_required_columns(mapping) {
            return Err(ImportError::MissingMapping);
        }
        Ok(Self {
            mapper: FieldMapper::new(mapping, today, limits.title_fallback_chars),
            limits,
        })
    }

    /// 执行导入
    ///
    /// # 返回
    /// - Ok(ImportSummary): imported + skipped == rows.len()
    /// - Err: 致命存储错误（调用方必须回滚整个事务）
    pub fn execute(
        &self,
        rows: &[RawRow],
        sink: &mut dyn EntryImportSink,
    ) -> RepositoryResult<ImportSummary> {
        let mut resolver = ReferenceResolver::new();
        let mut summary = SummaryBuilder::new(self.limits.max_error_messages);

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;

            sink.begin_row()?;
            let outcome = match self.process_row(row, &mut resolver, sink) {
                Ok(Some(entry_id)) => RowOutcome::Imported(entry_id),
                Ok(None) => RowOutcome::Skipped,
                Err(RowError::Storage(err)) if err.is_fatal() => {
                    tracing::error!(row = row_number, error = %err, "致命存储错误，终止导入");
                    return Err(err);
                }
                Err(err) => RowOutcome::Failed(err.to_string()),
            };

            let keep = matches!(outcome, RowOutcome::Imported(_));
            sink.finish_row(keep)?;
            if keep {
                resolver.commit_row();
            } else {
                resolver.rollback_row();
            }

            summary.record(row_number, outcome);
        }

        tracing::debug!(
            reference_lookups = resolver.lookups(),
            references_created = resolver.created(),
            "引用解析统计"
        );
        Ok(summary.summary)
    }

    fn process_row(
        &self,
        row: &RawRow,
        resolver: &mut ReferenceResolver,
        sink: &mut dyn EntryImportSink,
    ) -> Result<Option<i64>, RowError> {
        let Some(extracted) = self.mapper.extract(row)? else {
            return Ok(None);
        };

        let equipment_id = match extracted.equipment_name.as_deref() {
            Some(name) => resolver.resolve(sink, ReferenceKind::Equipment, name)?,
            None => None,
        };
        let topic_id = match extracted.topic_name.as_deref() {
            Some(name) => resolver.resolve(sink, ReferenceKind::Topic, name)?,
            None => None,
        };

        let entry = NewEntry {
            title: extracted.title,
            question: extracted.question,
            answer: extracted.answer,
            equipment_id,
            topic_id,
            repair_type: extracted.repair_type,
            severity: extracted.severity,
            source: extracted.source,
            date_reported: extracted.date_reported,
            date_resolved: None,
        };
        let entry_id = sink.insert_entry(&entry)?;

        for tag in &extracted.tags {
            sink.insert_tag(entry_id, tag)?;
        }

        Ok(Some(entry_id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::types::Severity;
    use crate::repository::error::RepositoryError;
    use std::collections::HashMap;

    // ==========================================
    // 内存写入端（模拟保存点语义）
    // ==========================================
    #[derive(Debug, Clone, Default)]
    struct MemoryState {
        entries: Vec<(i64, NewEntry)>,
        tags: Vec<(i64, String)>,
        references: HashMap<(ReferenceKind, String), i64>,
        next_id: i64,
    }

    #[derive(Debug, Default)]
    pub(crate) struct MemorySink {
        state: MemoryState,
        savepoint: Option<MemoryState>,
        pub find_calls: usize,
        create_calls: HashMap<ReferenceKind, usize>,
        /// 标题等于该值时 insert_entry 返回行级约束错误
        pub reject_title: Option<String>,
        /// 标题等于该值时 insert_entry 返回致命错误
        pub fatal_title: Option<String>,
        /// 标题等于该值时 insert_entry 返回检查约束错误
        pub check_title: Option<String>,
    }

    impl MemorySink {
        pub fn created(&self, kind: ReferenceKind) -> usize {
            self.create_calls.get(&kind).copied().unwrap_or(0)
        }

        fn next_id(&mut self) -> i64 {
            self.state.next_id += 1;
            self.state.next_id
        }

        fn entries(&self) -> &[(i64, NewEntry)] {
            &self.state.entries
        }

        fn tags_of(&self, entry_id: i64) -> Vec<&str> {
            self.state
                .tags
                .iter()
                .filter(|(id, _)| *id == entry_id)
                .map(|(_, t)| t.as_str())
                .collect()
        }
    }

    impl EntryImportSink for MemorySink {
        fn begin_row(&mut self) -> RepositoryResult<()> {
            self.savepoint = Some(self.state.clone());
            Ok(())
        }

        fn finish_row(&mut self, keep: bool) -> RepositoryResult<()> {
            let saved = self.savepoint.take().ok_or_else(|| {
                RepositoryError::DatabaseTransactionError("no savepoint".to_string())
            })?;
            if !keep {
                self.state = saved;
            }
            Ok(())
        }

        fn find_reference(
            &mut self,
            kind: ReferenceKind,
            name: &str,
        ) -> RepositoryResult<Option<i64>> {
            self.find_calls += 1;
            Ok(self.state.references.get(&(kind, name.to_string())).copied())
        }

        fn create_reference(&mut self, kind: ReferenceKind, name: &str) -> RepositoryResult<i64> {
            *self.create_calls.entry(kind).or_insert(0) += 1;
            let id = self.next_id();
            self.state.references.insert((kind, name.to_string()), id);
            Ok(id)
        }

        fn insert_entry(&mut self, entry: &NewEntry) -> RepositoryResult<i64> {
            if self.fatal_title.as_deref() == Some(entry.title.as_str()) {
                return Err(RepositoryError::StorageFailure("disk I/O error".to_string()));
            }
            if self.check_title.as_deref() == Some(entry.title.as_str()) {
                return Err(RepositoryError::CheckConstraintViolation(
                    "CHECK constraint failed: severity".to_string(),
                ));
            }
            if self.reject_title.as_deref() == Some(entry.title.as_str()) {
                return Err(RepositoryError::UniqueConstraintViolation(
                    "UNIQUE constraint failed: topics.name".to_string(),
                ));
            }
            let id = self.next_id();
            self.state.entries.push((id, entry.clone()));
            Ok(id)
        }

        fn insert_tag(&mut self, entry_id: i64, tag: &str) -> RepositoryResult<()> {
            if !self
                .state
                .tags
                .iter()
                .any(|(id, t)| *id == entry_id && t == tag)
            {
                self.state.tags.push((entry_id, tag.to_string()));
            }
            Ok(())
        }
    }

    // ==========================================
    // 辅助函数
    // ==========================================
    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            title: Some("Title".to_string()),
            question: Some("Problem".to_string()),
            answer: Some("Fix".to_string()),
            equipment: Some("Machine".to_string()),
            topic: Some("Area".to_string()),
            severity: Some("Sev".to_string()),
            tags: Some("Tags".to_string()),
            ..Default::default()
        }
    }

    fn run(rows: &[RawRow], sink: &mut MemorySink) -> ImportSummary {
        let m = mapping();
        let executor = ImportExecutor::new(&m, ImportLimits::default(), today()).unwrap();
        executor.execute(rows, sink).unwrap()
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[test]
    fn test_three_row_scenario() {
        let rows = vec![
            row(&[("Title", "Pump noise"), ("Problem", "Why loud?"), ("Fix", "Replace bearing"), ("Machine", "P-100")]),
            row(&[("Title", ""), ("Problem", ""), ("Fix", "x"), ("Machine", "P-100")]),
            row(&[("Title", ""), ("Problem", "Leak at seal"), ("Fix", "Tighten"), ("Machine", "P-100")]),
        ];
        let mut sink = MemorySink::default();

        let summary = run(&rows, &mut sink);

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert!(summary.errors.is_empty());
        assert_eq!(sink.created(ReferenceKind::Equipment), 1);
        assert_eq!(sink.find_calls, 1);

        let entries = sink.entries();
        assert_eq!(entries[1].1.title, "Leak at seal");
        assert_eq!(entries[0].1.equipment_id, entries[1].1.equipment_id);
    }

    #[test]
    fn test_missing_mapping_rejected_before_rows() {
        let m = ColumnMapping {
            title: Some("  ".to_string()),
            answer: Some("Fix".to_string()),
            ..Default::default()
        };
        let result = ImportExecutor::new(&m, ImportLimits::default(), today());
        assert!(matches!(result, Err(ImportError::MissingMapping)));
    }

    #[test]
    fn test_severity_and_tags() {
        let rows = vec![row(&[
            ("Title", "Overheat"),
            ("Sev", "Critical"),
            ("Tags", "motor; heat |motor, ,fan"),
        ])];
        let mut sink = MemorySink::default();

        run(&rows, &mut sink);

        let (id, entry) = &sink.entries()[0];
        assert_eq!(entry.severity, Severity::Critical);
        assert_eq!(sink.tags_of(*id), vec!["motor", "heat", "fan"]);
    }

    #[test]
    fn test_failed_row_is_recorded_and_rolled_back() {
        let rows = vec![
            row(&[("Title", "ok one"), ("Area", "Coolant")]),
            row(&[("Title", "bad"), ("Area", "Vacuum"), ("Tags", "a")]),
            row(&[("Title", "ok two"), ("Area", "Vacuum")]),
        ];
        let mut sink = MemorySink {
            reject_title: Some("bad".to_string()),
            ..Default::default()
        };

        let summary = run(&rows, &mut sink);

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Row 2: "));

        // 第 2 行新建的主题已随行回滚，第 3 行重新创建且 id 有效
        let vacuum_id = sink.entries()[1].1.topic_id;
        assert!(vacuum_id.is_some());
        assert_eq!(
            sink.state.references.get(&(ReferenceKind::Topic, "Vacuum".to_string())).copied(),
            vacuum_id
        );
        assert_eq!(sink.state.tags.len(), 0);
    }

    #[test]
    fn test_error_messages_are_capped() {
        let rows: Vec<RawRow> = (0..25).map(|_| row(&[("Title", "bad")])).collect();
        let mut sink = MemorySink {
            reject_title: Some("bad".to_string()),
            ..Default::default()
        };

        let summary = run(&rows, &mut sink);

        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 25);
        assert_eq!(summary.errors.len(), 20);
        assert!(summary.errors[19].starts_with("Row 20: "));
    }

    #[test]
    fn test_fatal_error_aborts_run() {
        let rows = vec![row(&[("Title", "first")]), row(&[("Title", "boom")])];
        let mut sink = MemorySink {
            fatal_title: Some("boom".to_string()),
            ..Default::default()
        };
        let m = mapping();
        let executor = ImportExecutor::new(&m, ImportLimits::default(), today()).unwrap();

        let err = executor.execute(&rows, &mut sink).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_check_violation_aborts_run() {
        let rows = vec![
            row(&[("Title", "first")]),
            row(&[("Title", "odd severity")]),
            row(&[("Title", "never reached")]),
        ];
        let mut sink = MemorySink {
            check_title: Some("odd severity".to_string()),
            ..Default::default()
        };
        let m = mapping();
        let executor = ImportExecutor::new(&m, ImportLimits::default(), today()).unwrap();

        let err = executor.execute(&rows, &mut sink).unwrap_err();
        assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));
        assert!(err.is_fatal());
        assert!(sink.entries().iter().all(|(_, e)| e.title != "never reached"));
    }

    #[test]
    fn test_imported_plus_skipped_equals_total() {
        let rows = vec![
            row(&[("Title", "a")]),
            row(&[]),
            row(&[("Problem", "b")]),
            row(&[("Title", "bad")]),
            row(&[("Fix", "answer only")]),
        ];
        let mut sink = MemorySink {
            reject_title: Some("bad".to_string()),
            ..Default::default()
        };

        let summary = run(&rows, &mut sink);

        assert_eq!(summary.imported + summary.skipped, rows.len());
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.errors.len(), 1);
    }
}
