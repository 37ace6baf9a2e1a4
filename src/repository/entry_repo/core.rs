use crate::domain::entry::{EntryPatch, NewEntry, Occurrence};
use crate::domain::types::Severity;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{format_date, parse_optional_date, parse_severity, parse_timestamp};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// EntryRepository - 知识条目仓储
// ==========================================
pub struct EntryRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 更新前的当前值
struct StoredEntry {
    title: String,
    question: String,
    answer: String,
    equipment_id: Option<i64>,
    topic_id: Option<i64>,
    repair_type: String,
    severity: Severity,
    source: String,
    date_reported: Option<NaiveDate>,
    date_resolved: Option<NaiveDate>,
}

impl EntryRepository {
    /// 创建新的条目仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 新建条目（含标签，单事务）
    ///
    /// # 参数
    /// - `entry`: 条目字段
    /// - `tags`: 已清洗的标签
    ///
    /// # 返回
    /// - `Ok(id)`: 新条目 id
    /// - `Err(ForeignKeyViolation)`: equipment_id / topic_id 不存在
    pub fn insert(&self, entry: &NewEntry, tags: &[String]) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO entries (
                title, question, answer, equipment_id, topic_id,
                repair_type, severity, source, date_reported, date_resolved
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.title,
                entry.question,
                entry.answer,
                entry.equipment_id,
                entry.topic_id,
                entry.repair_type,
                entry.severity.as_str(),
                entry.source,
                format_date(entry.date_reported),
                entry.date_resolved.map(format_date),
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::replace_tags_tx(&tx, id, tags)?;

        tx.commit()?;
        Ok(id)
    }

    /// 部分更新条目
    ///
    /// # 返回
    /// - `Ok(false)`: 条目不存在
    pub fn update(&self, id: i64, patch: &EntryPatch) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let Some(current) = Self::load_stored_tx(&tx, id)? else {
            return Ok(false);
        };

        tx.execute(
            r#"
            UPDATE entries SET
                title = ?1, question = ?2, answer = ?3,
                equipment_id = ?4, topic_id = ?5,
                repair_type = ?6, severity = ?7, source = ?8,
                date_reported = ?9, date_resolved = ?10,
                updated_at = datetime('now')
            WHERE id = ?11
            "#,
            params![
                patch.title.as_ref().unwrap_or(&current.title),
                patch.question.as_ref().unwrap_or(&current.question),
                patch.answer.as_ref().unwrap_or(&current.answer),
                patch.equipment_id.unwrap_or(current.equipment_id),
                patch.topic_id.unwrap_or(current.topic_id),
                patch.repair_type.as_ref().unwrap_or(&current.repair_type),
                patch.severity.unwrap_or(current.severity).as_str(),
                patch.source.as_ref().unwrap_or(&current.source),
                patch.date_reported.or(current.date_reported).map(format_date),
                patch.date_resolved.unwrap_or(current.date_resolved).map(format_date),
                id,
            ],
        )?;

        if let Some(tags) = &patch.tags {
            Self::replace_tags_tx(&tx, id, tags)?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// 删除条目（级联删除标签与发生记录）
    ///
    /// # 返回
    /// - `Ok(false)`: 条目不存在
    pub fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// 记录一次重复发生，并刷新条目 updated_at
    ///
    /// # 返回
    /// - `Ok(None)`: 条目不存在
    pub fn log_occurrence(
        &self,
        entry_id: i64,
        reported_by: &str,
        notes: &str,
    ) -> RepositoryResult<Option<Occurrence>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM entries WHERE id = ?1", params![entry_id], |r| r.get(0))
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO occurrence_log (entry_id, reported_by, notes) VALUES (?1, ?2, ?3)",
            params![entry_id, reported_by, notes],
        )?;
        let occurrence_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE entries SET updated_at = datetime('now') WHERE id = ?1",
            params![entry_id],
        )?;

        let occurrence = tx.query_row(
            "SELECT id, entry_id, occurred_at, reported_by, notes FROM occurrence_log WHERE id = ?1",
            params![occurrence_id],
            map_occurrence_row,
        )?;

        tx.commit()?;
        Ok(Some(occurrence))
    }

    // ==========================================
    // 事务内辅助
    // ==========================================

    fn replace_tags_tx(tx: &Transaction, entry_id: i64, tags: &[String]) -> RepositoryResult<()> {
        tx.execute("DELETE FROM entry_tags WHERE entry_id = ?1", params![entry_id])?;
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO entry_tags (entry_id, tag) VALUES (?1, ?2)")?;
        for tag in tags {
            stmt.execute(params![entry_id, tag])?;
        }
        Ok(())
    }

    fn load_stored_tx(tx: &Transaction, id: i64) -> RepositoryResult<Option<StoredEntry>> {
        let stored = tx
            .query_row(
                r#"
                SELECT title, question, answer, equipment_id, topic_id,
                       repair_type, severity, source, date_reported, date_resolved
                FROM entries WHERE id = ?1
                "#,
                params![id],
                |row| {
                    let severity: String = row.get(6)?;
                    Ok(StoredEntry {
                        title: row.get(0)?,
                        question: row.get(1)?,
                        answer: row.get(2)?,
                        equipment_id: row.get(3)?,
                        topic_id: row.get(4)?,
                        repair_type: row.get(5)?,
                        severity: parse_severity(6, &severity)?,
                        source: row.get(7)?,
                        date_reported: parse_optional_date(row.get(8)?),
                        date_resolved: parse_optional_date(row.get(9)?),
                    })
                },
            )
            .optional()?;
        Ok(stored)
    }
}

/// occurrence_log 行映射（id, entry_id, occurred_at, reported_by, notes）
pub(super) fn map_occurrence_row(row: &rusqlite::Row) -> rusqlite::Result<Occurrence> {
    let occurred_at: String = row.get(2)?;
    Ok(Occurrence {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        occurred_at: parse_timestamp(2, &occurred_at)?,
        reported_by: row.get(3)?,
        notes: row.get(4)?,
    })
}
