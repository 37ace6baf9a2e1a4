// ==========================================
// 故障知识库 - 检索数据仓储
// ==========================================
// 关键词: 每个词须命中 title/question/answer/source 之一（fold_case + LIKE，Unicode 大小写不敏感）
// 无关键词: 退化为过滤列表
// 排序: updated_at DESC
// ==========================================

use crate::domain::search::{snippet, snippet_source, SearchHit, SearchQuery, SearchResults};
use crate::repository::entry_repo::{attach_tags, map_entry_row, ENTRY_SELECT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{format_date, like_contains, WhereBuilder};
use rusqlite::types::ToSql;
use rusqlite::{Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

/// 默认返回条数
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
/// 返回条数上限
pub const MAX_SEARCH_LIMIT: u32 = 200;

const TERM_CLAUSE: &str = "(fold_case(e.title) LIKE ? ESCAPE '\\' \
     OR fold_case(e.question) LIKE ? ESCAPE '\\' \
     OR fold_case(e.answer) LIKE ? ESCAPE '\\' \
     OR fold_case(e.source) LIKE ? ESCAPE '\\')";

pub struct SearchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SearchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn build_filter(query: &SearchQuery) -> WhereBuilder {
        let mut filter = WhereBuilder::new();

        for term in query.terms() {
            let pattern = like_contains(&term.to_lowercase());
            filter.push(
                TERM_CLAUSE,
                (0..4)
                    .map(|_| Box::new(pattern.clone()) as Box<dyn ToSql>)
                    .collect(),
            );
        }

        filter.push_opt("e.equipment_id = ?", query.equipment_id);
        filter.push_opt("e.topic_id = ?", query.topic_id);
        filter.push_opt("e.severity = ?", query.severity.map(|s| s.as_str()));
        filter.push_opt(
            "e.repair_type = ?",
            query.repair_type.clone().filter(|r| !r.is_empty()),
        );
        filter.push_opt("e.date_reported >= ?", query.date_from.map(format_date));
        filter.push_opt("e.date_reported <= ?", query.date_to.map(format_date));
        filter
    }

    /// 检索条目
    pub fn search(&self, query: &SearchQuery) -> RepositoryResult<SearchResults> {
        let conn = self.get_conn()?;

        let limit = i64::from(
            query
                .limit
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .clamp(1, MAX_SEARCH_LIMIT),
        );
        let offset = i64::from(query.offset.unwrap_or(0));
        let filter = Self::build_filter(query);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM entries e {}", filter.sql()),
            filter.params().as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{} {} ORDER BY e.updated_at DESC, e.id DESC LIMIT ? OFFSET ?",
            ENTRY_SELECT,
            filter.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut entries = stmt
            .query_map(filter.params_with(&[&limit, &offset]).as_slice(), map_entry_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        attach_tags(&conn, &mut entries)?;

        let needle = query.query.trim();
        let results = entries
            .into_iter()
            .map(|entry| {
                let snippet = if needle.is_empty() {
                    String::new()
                } else {
                    snippet(snippet_source(&entry), needle)
                };
                SearchHit { entry, snippet }
            })
            .collect();

        Ok(SearchResults { results, total })
    }
}
