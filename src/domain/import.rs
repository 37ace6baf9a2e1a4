// ==========================================
// 故障知识库 - 批量导入领域模型
// ==========================================
// 导入运行 (Import Run) 为瞬态对象，不落库：
// 上传文件 → 列清单 + 预览 → 用户确认列映射 → 执行 → 汇总结果
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 原始行记录（列名 → 单元格文本，空单元格为 ""）
pub type RawRow = HashMap<String, String>;

/// 解析后的表格（列顺序与表头一致）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedTable {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// 生成预览（列清单 + 前 `preview_rows` 行 + 总行数）
    pub fn preview(&self, preview_rows: usize, file_name: &str) -> FilePreview {
        FilePreview {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(preview_rows).cloned().collect(),
            total_rows: self.rows.len(),
            file_name: file_name.to_string(),
        }
    }
}

/// 文件预览（供前端列映射界面使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub total_rows: usize,
    pub file_name: String,
}

/// 可映射的逻辑字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    Title,
    Question,
    Answer,
    Equipment,
    Topic,
    RepairType,
    Severity,
    Source,
    DateReported,
    Tags,
}

impl LogicalField {
    pub const ALL: [LogicalField; 10] = [
        LogicalField::Title,
        LogicalField::Question,
        LogicalField::Answer,
        LogicalField::Equipment,
        LogicalField::Topic,
        LogicalField::RepairType,
        LogicalField::Severity,
        LogicalField::Source,
        LogicalField::DateReported,
        LogicalField::Tags,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            LogicalField::Title => "title",
            LogicalField::Question => "question",
            LogicalField::Answer => "answer",
            LogicalField::Equipment => "equipment",
            LogicalField::Topic => "topic",
            LogicalField::RepairType => "repair_type",
            LogicalField::Severity => "severity",
            LogicalField::Source => "source",
            LogicalField::DateReported => "date_reported",
            LogicalField::Tags => "tags",
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 列映射：逻辑字段 → 源文件列名
///
/// 来自客户端，视为不可信输入：
/// - 未知键忽略
/// - 空串/纯空白视为未映射
/// - 映射到不存在的列时，该字段按空串处理
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub title: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub equipment: Option<String>,
    pub topic: Option<String>,
    pub repair_type: Option<String>,
    pub severity: Option<String>,
    pub source: Option<String>,
    pub date_reported: Option<String>,
    pub tags: Option<String>,
}

impl ColumnMapping {
    /// 查询字段映射到的列名（未映射返回 None）
    pub fn column(&self, field: LogicalField) -> Option<&str> {
        let raw = match field {
            LogicalField::Title => &self.title,
            LogicalField::Question => &self.question,
            LogicalField::Answer => &self.answer,
            LogicalField::Equipment => &self.equipment,
            LogicalField::Topic => &self.topic,
            LogicalField::RepairType => &self.repair_type,
            LogicalField::Severity => &self.severity,
            LogicalField::Source => &self.source,
            LogicalField::DateReported => &self.date_reported,
            LogicalField::Tags => &self.tags,
        };
        raw.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn is_mapped(&self, field: LogicalField) -> bool {
        self.column(field).is_some()
    }

    /// 取映射列的 TRIM 后取值
    ///
    /// - 未映射: None
    /// - 已映射但该行无此列: Some("")
    pub fn cell<'r>(&self, row: &'r RawRow, field: LogicalField) -> Option<&'r str> {
        self.column(field)
            .map(|col| row.get(col).map(|v| v.trim()).unwrap_or(""))
    }

    /// 已映射字段清单（日志用）
    pub fn mapped_fields(&self) -> Vec<&'static str> {
        LogicalField::ALL
            .iter()
            .filter(|f| self.is_mapped(**f))
            .map(|f| f.key())
            .collect()
    }
}

/// 导入结果汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// 行级错误消息（有上限，非完整清单）
    pub errors: Vec<String>,
}
