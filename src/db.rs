// ==========================================
// 故障知识库 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键必须每个连接单独开启）
// - 统一 busy_timeout，并发导入时等待写锁而不是直接报 busy
// - 注册 fold_case()（Unicode 小写，内置 lower()/LIKE 只处理 ASCII）
// - 幂等建表 + 默认主题种子数据
// ==========================================

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Unicode 大小写折叠函数名
pub const FOLD_CASE_FUNCTION: &str = "fold_case";

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 默认主题（主题表为空时写入）
pub const DEFAULT_TOPICS: [(&str, &str, &str); 8] = [
    ("Electrical", "Electrical systems, wiring, power supply issues", "#3B82F6"),
    ("Mechanical", "Mechanical components, bearings, gears, belts", "#10B981"),
    ("Hydraulic", "Hydraulic systems, pumps, valves, fluid issues", "#8B5CF6"),
    ("Pneumatic", "Air systems, compressors, pneumatic controls", "#F59E0B"),
    ("Software/PLC", "PLC programming, HMI, software errors", "#EC4899"),
    ("Safety", "Safety systems, interlocks, emergency stops", "#EF4444"),
    ("Preventive Maintenance", "Scheduled maintenance, inspections", "#6366F1"),
    ("Calibration", "Sensor calibration, measurement accuracy", "#14B8A6"),
];

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    model TEXT NOT NULL DEFAULT '',
    manufacturer TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#6B7280',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    equipment_id INTEGER REFERENCES equipment(id) ON DELETE SET NULL,
    topic_id INTEGER REFERENCES topics(id) ON DELETE SET NULL,
    repair_type TEXT NOT NULL DEFAULT '',
    severity TEXT NOT NULL DEFAULT 'medium'
        CHECK (severity IN ('low', 'medium', 'high', 'critical')),
    source TEXT NOT NULL DEFAULT '',
    date_reported TEXT DEFAULT (date('now')),
    date_resolved TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entry_tags (
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (entry_id, tag)
);

CREATE TABLE IF NOT EXISTS occurrence_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    occurred_at TEXT NOT NULL DEFAULT (datetime('now')),
    reported_by TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_entries_equipment ON entries(equipment_id);
CREATE INDEX IF NOT EXISTS idx_entries_topic ON entries(topic_id);
CREATE INDEX IF NOT EXISTS idx_entries_severity ON entries(severity);
CREATE INDEX IF NOT EXISTS idx_entries_date_reported ON entries(date_reported);
CREATE INDEX IF NOT EXISTS idx_equipment_name ON equipment(name);
CREATE INDEX IF NOT EXISTS idx_occurrence_entry ON occurrence_log(entry_id);
CREATE INDEX IF NOT EXISTS idx_occurrence_date ON occurrence_log(occurred_at);
CREATE INDEX IF NOT EXISTS idx_entry_tags_tag ON entry_tags(tag);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    conn.create_scalar_function(
        FOLD_CASE_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并完成建表（测试/临时场景）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 幂等建表，并在主题表为空时写入默认主题
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    let topic_count: i64 = conn.query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))?;
    if topic_count == 0 {
        let mut stmt =
            conn.prepare("INSERT INTO topics (name, description, color) VALUES (?1, ?2, ?3)")?;
        for (name, description, color) in DEFAULT_TOPICS {
            stmt.execute([name, description, color])?;
        }
        tracing::info!(count = DEFAULT_TOPICS.len(), "已写入默认主题");
    }

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
