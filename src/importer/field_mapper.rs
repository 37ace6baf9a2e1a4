// ==========================================
// 故障知识库 - 字段映射器实现
// ==========================================
// 职责: 原始行 + 列映射 → 待写入字段（TRIM / 默认值 / 类型转换）
// 不做: 引用解析、落库
// ==========================================

use crate::domain::entry::normalize_tags;
use crate::domain::import::{ColumnMapping, LogicalField, RawRow};
use crate::domain::types::Severity;
use crate::importer::error::RowError;
use chrono::{NaiveDate, NaiveDateTime};

/// 标签分隔符
const TAG_SEPARATORS: [char; 3] = [',', ';', '|'];

/// 可接受的日期格式（按顺序尝试）
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// 单行提取结果（引用仍为名称，尚未解析为 id）
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub title: String,
    pub question: String,
    pub answer: String,
    pub equipment_name: Option<String>,
    pub topic_name: Option<String>,
    pub repair_type: String,
    pub severity: Severity,
    pub source: String,
    pub date_reported: NaiveDate,
    pub tags: Vec<String>,
}

pub struct FieldMapper<'a> {
    mapping: &'a ColumnMapping,
    today: NaiveDate,
    title_fallback_chars: usize,
}

impl<'a> FieldMapper<'a> {
    /// # 参数
    /// - mapping: 已确认的列映射
    /// - today: date_reported 未映射时使用的日期
    /// - title_fallback_chars: 标题为空时从问题截取的字符数
    pub fn new(mapping: &'a ColumnMapping, today: NaiveDate, title_fallback_chars: usize) -> Self {
        Self {
            mapping,
            today,
            title_fallback_chars,
        }
    }

    /// 映射列是否满足最低要求（title 或 question 至少映射一个）
    pub fn has_required_columns(mapping: &ColumnMapping) -> bool {
        mapping.is_mapped(LogicalField::Title) || mapping.is_mapped(LogicalField::Question)
    }

    fn text(&self, row: &RawRow, field: LogicalField) -> String {
        self.mapping.cell(row, field).unwrap_or("").to_string()
    }

    fn optional_text(&self, row: &RawRow, field: LogicalField) -> Option<String> {
        self.mapping
            .cell(row, field)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// 提取一行
    ///
    /// # 返回
    /// - Ok(None): title 与 question 均为空（静默跳过）
    /// - Ok(Some(row)): 可写入
    /// - Err(RowError): 字段值非法
    pub fn extract(&self, row: &RawRow) -> Result<Option<ExtractedRow>, RowError> {
        let mut title = self.text(row, LogicalField::Title);
        let question = self.text(row, LogicalField::Question);

        if title.is_empty() && question.is_empty() {
            return Ok(None);
        }
        if title.is_empty() {
            title = question.chars().take(self.title_fallback_chars).collect();
        }

        let severity = self
            .mapping
            .cell(row, LogicalField::Severity)
            .map(Severity::coerce)
            .unwrap_or_default();

        // 仅未映射时取当天；已映射的空值同样视为非法
        let date_reported = match self.mapping.cell(row, LogicalField::DateReported) {
            None => self.today,
            Some(raw) => parse_date(raw).ok_or_else(|| RowError::InvalidFieldValue {
                field: LogicalField::DateReported.key().to_string(),
                value: raw.to_string(),
            })?,
        };

        let tags = self
            .mapping
            .cell(row, LogicalField::Tags)
            .map(split_tags)
            .unwrap_or_default();

        Ok(Some(ExtractedRow {
            title,
            question,
            answer: self.text(row, LogicalField::Answer),
            equipment_name: self.optional_text(row, LogicalField::Equipment),
            topic_name: self.optional_text(row, LogicalField::Topic),
            repair_type: self.text(row, LogicalField::RepairType),
            severity,
            source: self.text(row, LogicalField::Source),
            date_reported,
            tags,
        }))
    }
}

/// 解析日期（仅取日期部分）
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// 标签拆分：按 , ; | 分割，TRIM，去空，保序去重
pub fn split_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(TAG_SEPARATORS.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            title: Some("Title".to_string()),
            question: Some("Problem".to_string()),
            answer: Some("Fix".to_string()),
            severity: Some("Sev".to_string()),
            date_reported: Some("Date".to_string()),
            tags: Some("Tags".to_string()),
            equipment: Some("Machine".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_skip_when_title_and_question_empty() {
        let m = mapping();
        let mapper = FieldMapper::new(&m, today(), 100);
        let r = row(&[("Title", "  "), ("Problem", ""), ("Fix", "something")]);
        assert_eq!(mapper.extract(&r).unwrap(), None);
    }

    #[test]
    fn test_title_falls_back_to_question_prefix() {
        let m = mapping();
        let mapper = FieldMapper::new(&m, today(), 100);
        let question = "é".repeat(150);
        let r = row(&[("Title", ""), ("Problem", &question)]);

        let extracted = mapper.extract(&r).unwrap().unwrap();
        assert_eq!(extracted.title.chars().count(), 100);
        assert!(question.starts_with(&extracted.title));
        assert_eq!(extracted.question, question);
    }

    #[test]
    fn test_defaults_for_unmapped_and_empty_fields() {
        let m = ColumnMapping {
            question: Some("Problem".to_string()),
            ..Default::default()
        };
        let mapper = FieldMapper::new(&m, today(), 100);
        let extracted = mapper
            .extract(&row(&[("Problem", "Why is it hot?")]))
            .unwrap()
            .unwrap();

        assert_eq!(extracted.severity, Severity::Medium);
        assert_eq!(extracted.date_reported, today());
        assert_eq!(extracted.answer, "");
        assert_eq!(extracted.equipment_name, None);
        assert!(extracted.tags.is_empty());
    }

    #[test]
    fn test_severity_coercion_and_date_parsing() {
        let m = mapping();
        let mapper = FieldMapper::new(&m, today(), 100);

        let r = row(&[("Title", "t"), ("Sev", " HIGH "), ("Date", "2024/02/29")]);
        let extracted = mapper.extract(&r).unwrap().unwrap();
        assert_eq!(extracted.severity, Severity::High);
        assert_eq!(
            extracted.date_reported,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let r = row(&[("Title", "t"), ("Sev", "urgent"), ("Date", "2024-03-01")]);
        let extracted = mapper.extract(&r).unwrap().unwrap();
        assert_eq!(extracted.severity, Severity::Medium);
    }

    #[test]
    fn test_blank_mapped_date_is_row_error() {
        let m = ColumnMapping {
            title: Some("T".to_string()),
            date_reported: Some("D".to_string()),
            ..Default::default()
        };
        let mapper = FieldMapper::new(&m, today(), 100);

        let err = mapper.extract(&row(&[("T", "x"), ("D", "  ")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid date_reported value ''");
        assert!(!err.is_fatal());

        // 该行缺少映射列时同样报错
        assert!(mapper.extract(&row(&[("T", "x")])).is_err());
    }

    #[test]
    fn test_invalid_date_is_row_error() {
        let m = mapping();
        let mapper = FieldMapper::new(&m, today(), 100);
        let r = row(&[("Title", "t"), ("Date", "last tuesday")]);

        let err = mapper.extract(&r).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid date_reported value 'last tuesday'"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_blank_reference_names_are_unset() {
        let m = mapping();
        let mapper = FieldMapper::new(&m, today(), 100);
        let r = row(&[("Title", "t"), ("Machine", "   ")]);
        assert_eq!(mapper.extract(&r).unwrap().unwrap().equipment_name, None);
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(
            split_tags(" pump, seal ;pump|| leak "),
            vec!["pump".to_string(), "seal".to_string(), "leak".to_string()]
        );
        assert!(split_tags(" , ; ").is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert_eq!(parse_date("2025-07-04"), Some(d));
        assert_eq!(parse_date("07/04/2025"), Some(d));
        assert_eq!(parse_date("2025-07-04 13:45:00"), Some(d));
        assert_eq!(parse_date("tomorrow"), None);
    }
}
