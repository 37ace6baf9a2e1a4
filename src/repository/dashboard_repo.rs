// ==========================================
// 故障知识库 - 统计看板数据仓储
// ==========================================
// 窗口: 最近 30 天 / 30~60 天 / 趋势 N 天（默认 90）
// 分布图按窗口内的发生记录计数
// 空引用统一显示为 Unassigned / Uncategorized
// ==========================================

use crate::domain::dashboard::{
    BreakdownItem, DailyCount, DashboardStats, FrequentIssue, TrendReport,
};
use crate::domain::types::Trend;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::parse_severity;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 高频问题默认条数
pub const DEFAULT_FREQUENT_LIMIT: u32 = 10;
/// 趋势默认天数
pub const DEFAULT_TREND_DAYS: u32 = 90;
/// 分布图最多条目数
const BREAKDOWN_TOP: i64 = 10;

const UNASSIGNED_EQUIPMENT: &str = "Unassigned";
const UNCATEGORIZED_TOPIC: &str = "Uncategorized";

pub struct DashboardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DashboardRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn count(conn: &Connection, sql: &str) -> RepositoryResult<i64> {
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    }

    /// 汇总计数
    pub fn stats(&self) -> RepositoryResult<DashboardStats> {
        let conn = self.get_conn()?;

        Ok(DashboardStats {
            total_entries: Self::count(&conn, "SELECT COUNT(*) FROM entries")?,
            total_equipment: Self::count(&conn, "SELECT COUNT(*) FROM equipment")?,
            total_topics: Self::count(&conn, "SELECT COUNT(*) FROM topics")?,
            entries_this_month: Self::count(
                &conn,
                "SELECT COUNT(*) FROM entries WHERE date_reported >= date('now', '-30 days')",
            )?,
            total_occurrences: Self::count(&conn, "SELECT COUNT(*) FROM occurrence_log")?,
        })
    }

    // ==========================================
    // 高频问题
    // ==========================================

    fn map_frequent_row(row: &Row) -> SqliteResult<FrequentIssue> {
        let severity: String = row.get(2)?;
        let recent_count: i64 = row.get(7)?;
        let previous_count: i64 = row.get(8)?;

        Ok(FrequentIssue {
            entry_id: row.get(0)?,
            title: row.get(1)?,
            severity: parse_severity(2, &severity)?,
            equipment_name: row.get(3)?,
            topic_name: row.get(4)?,
            topic_color: row.get(5)?,
            occurrence_count: row.get(6)?,
            recent_count,
            previous_count,
            trend: Trend::from_counts(recent_count, previous_count),
        })
    }

    /// 按最近 30 天发生次数排序的高频问题
    pub fn frequent_issues(&self, limit: u32) -> RepositoryResult<Vec<FrequentIssue>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.title, e.severity,
                   COALESCE(eq.name, ?1) AS equipment_name,
                   COALESCE(t.name, ?2) AS topic_name,
                   t.color,
                   COUNT(o.id) AS occurrence_count,
                   SUM(CASE WHEN o.occurred_at >= datetime('now', '-30 days')
                            THEN 1 ELSE 0 END) AS recent_count,
                   SUM(CASE WHEN o.occurred_at >= datetime('now', '-60 days')
                             AND o.occurred_at < datetime('now', '-30 days')
                            THEN 1 ELSE 0 END) AS previous_count
            FROM entries e
            JOIN occurrence_log o ON o.entry_id = e.id
            LEFT JOIN equipment eq ON e.equipment_id = eq.id
            LEFT JOIN topics t ON e.topic_id = t.id
            GROUP BY e.id
            ORDER BY recent_count DESC, occurrence_count DESC, e.id
            LIMIT ?3
            "#,
        )?;

        let issues = stmt
            .query_map(
                params![UNASSIGNED_EQUIPMENT, UNCATEGORIZED_TOPIC, i64::from(limit)],
                Self::map_frequent_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(issues)
    }

    // ==========================================
    // 趋势与分布
    // ==========================================

    fn daily_counts(conn: &Connection, sql: &str, window: &str) -> RepositoryResult<Vec<DailyCount>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![window], |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn breakdown(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
        with_color: bool,
    ) -> RepositoryResult<Vec<BreakdownItem>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok(BreakdownItem {
                    name: row.get(0)?,
                    count: row.get(1)?,
                    color: if with_color { row.get(2)? } else { None },
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 最近 `days` 天的趋势与分布
    pub fn trends(&self, days: u32) -> RepositoryResult<TrendReport> {
        let conn = self.get_conn()?;
        let window = format!("-{} days", days);

        let occurrence_trend = Self::daily_counts(
            &conn,
            r#"
            SELECT date(occurred_at) AS day, COUNT(*)
            FROM occurrence_log
            WHERE occurred_at >= datetime('now', ?1)
            GROUP BY day
            ORDER BY day
            "#,
            &window,
        )?;

        let entry_trend = Self::daily_counts(
            &conn,
            r#"
            SELECT date(created_at) AS day, COUNT(*)
            FROM entries
            WHERE created_at >= datetime('now', ?1)
            GROUP BY day
            ORDER BY day
            "#,
            &window,
        )?;

        let equipment_breakdown = Self::breakdown(
            &conn,
            r#"
            SELECT COALESCE(eq.name, ?2) AS label, COUNT(o.id) AS cnt
            FROM occurrence_log o
            JOIN entries e ON o.entry_id = e.id
            LEFT JOIN equipment eq ON e.equipment_id = eq.id
            WHERE o.occurred_at >= datetime('now', ?1)
            GROUP BY eq.id
            ORDER BY cnt DESC, label
            LIMIT ?3
            "#,
            params![window, UNASSIGNED_EQUIPMENT, BREAKDOWN_TOP],
            false,
        )?;

        let topic_breakdown = Self::breakdown(
            &conn,
            r#"
            SELECT COALESCE(t.name, ?2) AS label, COUNT(o.id) AS cnt, t.color
            FROM occurrence_log o
            JOIN entries e ON o.entry_id = e.id
            LEFT JOIN topics t ON e.topic_id = t.id
            WHERE o.occurred_at >= datetime('now', ?1)
            GROUP BY t.id
            ORDER BY cnt DESC, label
            LIMIT ?3
            "#,
            params![window, UNCATEGORIZED_TOPIC, BREAKDOWN_TOP],
            true,
        )?;

        let severity_breakdown = Self::breakdown(
            &conn,
            r#"
            SELECT e.severity, COUNT(o.id) AS cnt
            FROM occurrence_log o
            JOIN entries e ON o.entry_id = e.id
            WHERE o.occurred_at >= datetime('now', ?1)
            GROUP BY e.severity
            ORDER BY cnt DESC, e.severity
            "#,
            params![window],
            false,
        )?;

        Ok(TrendReport {
            occurrence_trend,
            entry_trend,
            equipment_breakdown,
            topic_breakdown,
            severity_breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<Mutex<Connection>>, DashboardRepository) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        (conn.clone(), DashboardRepository::new(conn))
    }

    fn insert_entry(conn: &Connection, title: &str, equipment_id: Option<i64>) -> i64 {
        conn.execute(
            "INSERT INTO entries (title, question, answer, equipment_id, severity) \
             VALUES (?1, 'q', 'a', ?2, 'high')",
            params![title, equipment_id],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn occur(conn: &Connection, entry_id: i64, days_ago: i64) {
        conn.execute(
            "INSERT INTO occurrence_log (entry_id, occurred_at) \
             VALUES (?1, datetime('now', ?2))",
            params![entry_id, format!("-{} days", days_ago)],
        )
        .unwrap();
    }

    #[test]
    fn test_stats_counts() {
        let (conn, repo) = setup();
        {
            let c = conn.lock().unwrap();
            let id = insert_entry(&c, "recent", None);
            c.execute(
                "INSERT INTO entries (title, question, answer, date_reported) \
                 VALUES ('old', 'q', 'a', '2001-01-01')",
                [],
            )
            .unwrap();
            occur(&c, id, 1);
        }

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_equipment, 0);
        assert_eq!(stats.total_topics, 8);
        assert_eq!(stats.entries_this_month, 1);
        assert_eq!(stats.total_occurrences, 1);
    }

    #[test]
    fn test_frequent_issues_trend_and_order() {
        let (conn, repo) = setup();
        let (rising, falling) = {
            let c = conn.lock().unwrap();
            c.execute("INSERT INTO equipment (name) VALUES ('Press 4')", [])
                .unwrap();
            let eq = c.last_insert_rowid();
            let rising = insert_entry(&c, "rising", Some(eq));
            let falling = insert_entry(&c, "falling", None);
            insert_entry(&c, "never", None);

            occur(&c, rising, 1);
            occur(&c, rising, 2);
            occur(&c, rising, 40);
            occur(&c, falling, 5);
            occur(&c, falling, 35);
            occur(&c, falling, 45);
            occur(&c, falling, 50);
            (rising, falling)
        };

        let issues = repo.frequent_issues(DEFAULT_FREQUENT_LIMIT).unwrap();
        assert_eq!(issues.len(), 2);

        assert_eq!(issues[0].entry_id, rising);
        assert_eq!(issues[0].equipment_name, "Press 4");
        assert_eq!(issues[0].recent_count, 2);
        assert_eq!(issues[0].previous_count, 1);
        assert_eq!(issues[0].trend, Trend::Rising);

        assert_eq!(issues[1].entry_id, falling);
        assert_eq!(issues[1].equipment_name, UNASSIGNED_EQUIPMENT);
        assert_eq!(issues[1].topic_name, UNCATEGORIZED_TOPIC);
        assert_eq!(issues[1].occurrence_count, 4);
        assert_eq!(issues[1].trend, Trend::Falling);

        assert_eq!(repo.frequent_issues(1).unwrap().len(), 1);
    }

    #[test]
    fn test_trends_window_and_breakdowns() {
        let (conn, repo) = setup();
        {
            let c = conn.lock().unwrap();
            let id = insert_entry(&c, "a", None);
            insert_entry(&c, "b", None);
            occur(&c, id, 0);
            occur(&c, id, 200);
        }

        let report = repo.trends(DEFAULT_TREND_DAYS).unwrap();
        assert_eq!(report.occurrence_trend.len(), 1);
        assert_eq!(report.occurrence_trend[0].count, 1);
        assert_eq!(report.entry_trend.iter().map(|d| d.count).sum::<i64>(), 2);
        assert_eq!(
            report.equipment_breakdown,
            vec![BreakdownItem {
                name: UNASSIGNED_EQUIPMENT.to_string(),
                color: None,
                count: 1,
            }]
        );
        assert_eq!(report.topic_breakdown[0].name, UNCATEGORIZED_TOPIC);
        assert_eq!(report.topic_breakdown[0].count, 1);
        assert_eq!(report.severity_breakdown[0].name, "high");
    }

    #[test]
    fn test_breakdowns_count_occurrences_not_entries() {
        let (conn, repo) = setup();
        {
            let c = conn.lock().unwrap();
            c.execute("INSERT INTO equipment (name) VALUES ('Press')", [])
                .unwrap();
            let first_press = c.last_insert_rowid();
            c.execute("INSERT INTO equipment (name) VALUES ('Press')", [])
                .unwrap();
            let second_press = c.last_insert_rowid();

            let recurring = insert_entry(&c, "recurring", Some(first_press));
            let other = insert_entry(&c, "other press", Some(second_press));
            insert_entry(&c, "quiet", None);
            for _ in 0..3 {
                occur(&c, recurring, 1);
            }
            occur(&c, other, 2);
        }

        let report = repo.trends(DEFAULT_TREND_DAYS).unwrap();

        // 同名设备按 id 分开统计，无发生记录的条目不出现
        let counts: Vec<(&str, i64)> = report
            .equipment_breakdown
            .iter()
            .map(|b| (b.name.as_str(), b.count))
            .collect();
        assert_eq!(counts, vec![("Press", 3), ("Press", 1)]);
        assert_eq!(
            report.severity_breakdown,
            vec![BreakdownItem {
                name: "high".to_string(),
                color: None,
                count: 4,
            }]
        );
    }
}
