// ==========================================
// 故障知识库 - SQL 工具模块
// ==========================================
// 职责: 动态 WHERE 构建 / LIKE 转义 / 文本列解析
// 约束: 所有值走参数绑定，列名只来自代码常量
// ==========================================

use crate::domain::types::Severity;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, Type};
use rusqlite::Result as SqliteResult;

/// LIKE 转义字符（配合 `ESCAPE '\'` 使用）
pub const LIKE_ESCAPE: char = '\\';

/// 动态 WHERE 子句构建器
///
/// ```ignore
/// let mut w = WhereBuilder::new();
/// w.push_opt("e.topic_id = ?", query.topic_id);
/// let sql = format!("SELECT COUNT(*) FROM entries e {}", w.sql());
/// conn.query_row(&sql, w.params().as_slice(), |r| r.get(0))?;
/// ```
#[derive(Default)]
pub struct WhereBuilder {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加条件，clause 中的 `?` 数量必须与 values 一致
    pub fn push(&mut self, clause: impl Into<String>, values: Vec<Box<dyn ToSql>>) {
        self.clauses.push(clause.into());
        self.params.extend(values);
    }

    /// 值存在时添加单参数条件
    pub fn push_opt<T: ToSql + 'static>(&mut self, clause: &str, value: Option<T>) {
        if let Some(v) = value {
            self.push(clause, vec![Box::new(v) as Box<dyn ToSql>]);
        }
    }

    /// `WHERE a AND b`，无条件时为空串
    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// 追加分页参数后的参数列表
    pub fn params_with<'a>(&'a self, extra: &[&'a dyn ToSql]) -> Vec<&'a dyn ToSql> {
        let mut out = self.params();
        out.extend_from_slice(extra);
        out
    }
}

/// 转义 LIKE 通配符并包裹为 `%term%`
pub fn like_contains(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// 构建 IN 子句占位符，空列表返回永假条件
pub fn build_in_clause(column_name: &str, count: usize) -> String {
    if count == 0 {
        return "1 = 0".to_string();
    }
    let placeholders = vec!["?"; count].join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// 解析 `datetime('now')` 写入的时间戳（兼容 ISO 'T' 分隔）
pub fn parse_timestamp(idx: usize, raw: &str) -> SqliteResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| conversion_error(idx, e))
}

/// 解析可空日期列；无法解析的历史值视为空
pub fn parse_optional_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s.as_str()), "%Y-%m-%d").ok())
}

pub fn parse_severity(idx: usize, raw: &str) -> SqliteResult<Severity> {
    raw.parse::<Severity>().map_err(|msg| {
        conversion_error(
            idx,
            std::io::Error::new(std::io::ErrorKind::InvalidData, msg),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
