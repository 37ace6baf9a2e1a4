// ==========================================
// 故障知识库 - 知识条目 (Entry) 领域模型
// ==========================================
// 表: entries / entry_tags / occurrence_log
// 删除条目级联删除标签与发生记录
// ==========================================

use crate::domain::types::{Severity, SortOrder};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// 待写入的条目（已完成字段提取/默认值填充）
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub question: String,
    pub answer: String,
    pub equipment_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub repair_type: String,
    pub severity: Severity,
    pub source: String,
    pub date_reported: NaiveDate,
    pub date_resolved: Option<NaiveDate>,
}

/// 条目列表行（含设备/主题名称、发生次数、标签）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: i64,
    pub title: String,
    pub question: String,
    pub answer: String,
    pub equipment_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub repair_type: String,
    pub severity: Severity,
    pub source: String,
    pub date_reported: Option<NaiveDate>,
    pub date_resolved: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub equipment_name: Option<String>,
    pub equipment_model: Option<String>,
    pub topic_name: Option<String>,
    pub topic_color: Option<String>,
    pub occurrence_count: i64,
    pub tags: Vec<String>,
}

/// 条目详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: EntrySummary,
    pub equipment_manufacturer: Option<String>,
    pub occurrences: Vec<Occurrence>,
}

/// 重复发生记录（只追加）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: i64,
    pub entry_id: i64,
    pub occurred_at: NaiveDateTime,
    pub reported_by: String,
    pub notes: String,
}

/// 新建条目请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    pub equipment_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub repair_type: Option<String>,
    pub severity: Option<Severity>,
    pub source: Option<String>,
    pub date_reported: Option<NaiveDate>,
    pub date_resolved: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 部分更新请求
///
/// 可空外键/日期使用 `Option<Option<T>>`：
/// - 缺省 → 保持原值
/// - `null` → 置空
/// - 值 → 覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub equipment_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub topic_id: Option<Option<i64>>,
    pub repair_type: Option<String>,
    pub severity: Option<Severity>,
    pub source: Option<String>,
    pub date_reported: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_resolved: Option<Option<NaiveDate>>,
    /// 存在时整体替换标签集合
    pub tags: Option<Vec<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 条目列表查询参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub equipment_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub severity: Option<Severity>,
    pub repair_type: Option<String>,
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPage {
    pub entries: Vec<EntrySummary>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

/// 标签清洗：TRIM、去空、保序去重
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
