// ==========================================
// 故障知识库 - 主题数据仓储
// ==========================================
// 表: topics（name 唯一，重名返回 UniqueConstraintViolation）
// 删除主题时条目 topic_id 由外键置 NULL
// ==========================================

use crate::domain::reference::{Topic, TopicInput, DEFAULT_TOPIC_COLOR};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::parse_timestamp;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const TOPIC_SELECT: &str = r#"
    SELECT t.id, t.name, t.description, t.color, t.created_at,
           (SELECT COUNT(*) FROM entries WHERE topic_id = t.id) AS entry_count
    FROM topics t
"#;

pub struct TopicRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TopicRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<Topic> {
        let created_at: String = row.get(4)?;
        Ok(Topic {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
            entry_count: row.get(5)?,
        })
    }

    fn color_of(input: &TopicInput) -> &str {
        input
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TOPIC_COLOR)
    }

    /// 全部主题（按名称排序，含条目数）
    pub fn list(&self) -> RepositoryResult<Vec<Topic>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY t.name, t.id", TOPIC_SELECT))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Topic>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                &format!("{} WHERE t.id = ?1", TOPIC_SELECT),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(found)
    }

    /// 新建主题，返回 id
    ///
    /// # 返回
    /// - `Err(UniqueConstraintViolation)`: 名称已存在
    pub fn insert(&self, input: &TopicInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO topics (name, description, color) VALUES (?1, ?2, ?3)",
            params![
                input.name.trim(),
                input.description.as_deref().unwrap_or(""),
                Self::color_of(input),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 整体更新
    ///
    /// # 返回
    /// - `Ok(false)`: 主题不存在
    pub fn update(&self, id: i64, input: &TopicInput) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE topics SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
            params![
                input.name.trim(),
                input.description.as_deref().unwrap_or(""),
                Self::color_of(input),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM topics WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
