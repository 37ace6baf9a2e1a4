// ==========================================
// 故障知识库 - 检索读模型
// ==========================================
// 多关键词 AND，任一字段（title/question/answer/source）包含即命中
// 摘要按字符截取，不拆分多字节字符
// ==========================================

use crate::domain::entry::EntrySummary;
use crate::domain::types::Severity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 关键词两侧保留的字符数
pub const SNIPPET_CONTEXT_CHARS: usize = 60;
/// 未命中时的摘要长度
pub const SNIPPET_FALLBACK_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    pub query: String,
    pub equipment_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub severity: Option<Severity>,
    pub repair_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SearchQuery {
    /// 空白分隔的关键词
    pub fn terms(&self) -> Vec<&str> {
        self.query.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: EntrySummary,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub total: i64,
}

/// 生成检索摘要
///
/// - 在 text 中不区分大小写地查找整个 query
/// - 未找到: 前 150 个字符（截断时追加 "..."）
/// - 找到: 命中处前后各 60 个字符，被截断的一侧加 "..."
pub fn snippet(text: &str, query: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();

    let position = if needle.is_empty() || needle.len() > chars.len() {
        None
    } else {
        (0..=chars.len() - needle.len()).find(|&start| {
            chars[start..start + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
        })
    };

    match position {
        None => {
            let mut out: String = chars.iter().take(SNIPPET_FALLBACK_CHARS).collect();
            if chars.len() > SNIPPET_FALLBACK_CHARS {
                out.push_str(ELLIPSIS);
            }
            out
        }
        Some(idx) => {
            let start = idx.saturating_sub(SNIPPET_CONTEXT_CHARS);
            let end = (idx + needle.len() + SNIPPET_CONTEXT_CHARS).min(chars.len());

            let mut out = String::new();
            if start > 0 {
                out.push_str(ELLIPSIS);
            }
            out.extend(&chars[start..end]);
            if end < chars.len() {
                out.push_str(ELLIPSIS);
            }
            out
        }
    }
}

/// 摘要源文本: question → answer → title 中第一个非空者
pub fn snippet_source(entry: &EntrySummary) -> &str {
    [&entry.question, &entry.answer, &entry.title]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or("")
}
