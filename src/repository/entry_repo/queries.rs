use super::core::{map_occurrence_row, EntryRepository};
use crate::domain::entry::{EntryDetail, EntryListQuery, EntryPage, EntrySummary};
use crate::repository::error::RepositoryResult;
use crate::repository::sql_util::{
    build_in_clause, parse_optional_date, parse_severity, parse_timestamp, WhereBuilder,
};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::HashMap;

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// 分页大小上限
pub const MAX_PAGE_SIZE: u32 = 200;

/// 条目列表统一 SELECT（列顺序与 map_entry_row 对应；第 18 列为设备制造商）
pub(crate) const ENTRY_SELECT: &str = r#"
    SELECT e.id, e.title, e.question, e.answer, e.equipment_id, e.topic_id,
           e.repair_type, e.severity, e.source, e.date_reported, e.date_resolved,
           e.created_at, e.updated_at,
           eq.name, eq.model, t.name, t.color,
           (SELECT COUNT(*) FROM occurrence_log o WHERE o.entry_id = e.id) AS occurrence_count,
           eq.manufacturer
    FROM entries e
    LEFT JOIN equipment eq ON e.equipment_id = eq.id
    LEFT JOIN topics t ON e.topic_id = t.id
"#;

/// 映射 ENTRY_SELECT 的一行（标签另行加载）
pub(crate) fn map_entry_row(row: &Row) -> SqliteResult<EntrySummary> {
    let severity: String = row.get(7)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(EntrySummary {
        id: row.get(0)?,
        title: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        equipment_id: row.get(4)?,
        topic_id: row.get(5)?,
        repair_type: row.get(6)?,
        severity: parse_severity(7, &severity)?,
        source: row.get(8)?,
        date_reported: parse_optional_date(row.get(9)?),
        date_resolved: parse_optional_date(row.get(10)?),
        created_at: parse_timestamp(11, &created_at)?,
        updated_at: parse_timestamp(12, &updated_at)?,
        equipment_name: row.get(13)?,
        equipment_model: row.get(14)?,
        topic_name: row.get(15)?,
        topic_color: row.get(16)?,
        occurrence_count: row.get(17)?,
        tags: Vec::new(),
    })
}

/// 批量加载标签（按写入顺序）
pub(crate) fn attach_tags(conn: &Connection, entries: &mut [EntrySummary]) -> RepositoryResult<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT entry_id, tag FROM entry_tags WHERE {} ORDER BY entry_id, rowid",
        build_in_clause("entry_id", entries.len())
    );
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    let id_params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut by_entry: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(id_params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (entry_id, tag) = row?;
        by_entry.entry(entry_id).or_default().push(tag);
    }

    for entry in entries.iter_mut() {
        entry.tags = by_entry.remove(&entry.id).unwrap_or_default();
    }
    Ok(())
}

/// 排序列白名单（未知值回落为 updated_at）
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by.map(str::trim) {
        Some("created_at") => "e.created_at",
        Some("date_reported") => "e.date_reported",
        Some("title") => "e.title",
        Some("severity") => "e.severity",
        _ => "e.updated_at",
    }
}

impl EntryRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 分页查询条目
    pub fn list(&self, query: &EntryListQuery) -> RepositoryResult<EntryPage> {
        let conn = self.get_conn()?;

        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut filter = WhereBuilder::new();
        filter.push_opt("e.equipment_id = ?", query.equipment_id);
        filter.push_opt("e.topic_id = ?", query.topic_id);
        filter.push_opt("e.severity = ?", query.severity.map(|s| s.as_str()));
        filter.push_opt(
            "e.repair_type = ?",
            query.repair_type.clone().filter(|r| !r.is_empty()),
        );

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM entries e {}", filter.sql()),
            filter.params().as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{} {} ORDER BY {} {}, e.id {} LIMIT ? OFFSET ?",
            ENTRY_SELECT,
            filter.sql(),
            sort_column(query.sort_by.as_deref()),
            query.sort_order.as_sql(),
            query.sort_order.as_sql(),
        );
        let limit_param = i64::from(limit);
        let mut stmt = conn.prepare(&sql)?;
        let mut entries = stmt
            .query_map(
                filter.params_with(&[&limit_param, &offset]).as_slice(),
                map_entry_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        attach_tags(&conn, &mut entries)?;

        let total_pages = ((total + i64::from(limit) - 1) / i64::from(limit)) as u32;
        Ok(EntryPage {
            entries,
            total,
            page,
            limit,
            total_pages,
        })
    }

    /// 按 id 查询条目详情
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<EntryDetail>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!("{} WHERE e.id = ?", ENTRY_SELECT))?;
        let found = match stmt.query_row(params![id], |row| {
            Ok((map_entry_row(row)?, row.get::<_, Option<String>>(18)?))
        }) {
            Ok(found) => found,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (summary, equipment_manufacturer) = found;

        let mut entries = vec![summary];
        attach_tags(&conn, &mut entries)?;

        let occurrences = conn
            .prepare(
                r#"
                SELECT id, entry_id, occurred_at, reported_by, notes
                FROM occurrence_log
                WHERE entry_id = ?
                ORDER BY occurred_at DESC, id DESC
                "#,
            )?
            .query_map(params![id], map_occurrence_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let entry = entries.remove(0);
        Ok(Some(EntryDetail {
            entry,
            equipment_manufacturer,
            occurrences,
        }))
    }
}
