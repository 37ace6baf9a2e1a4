// ==========================================
// 故障知识库 - 性能观测
// ==========================================
// - SQLite profile 回调: SQL 计数 + 慢查询告警
// - PerfGuard: 单个操作的耗时 / SQL 数 / 慢 SQL 数
// 环境变量:
// - TROUBLESHOOT_KB_PERF_SQL=1       强制开启（Debug 默认开启）
// - TROUBLESHOOT_KB_SLOW_SQL_MS=50   慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const ENV_PERF_SQL: &str = "TROUBLESHOOT_KB_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "TROUBLESHOOT_KB_SLOW_SQL_MS";

static SQL_PROFILING: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    depth: u32,
    statements: u64,
    slow: u64,
}

thread_local! {
    static COUNTERS: Cell<Counters> = Cell::new(Counters::default());
}

fn update_counters(f: impl FnOnce(&mut Counters)) {
    COUNTERS.with(|cell| {
        let mut c = cell.get();
        f(&mut c);
        cell.set(c);
    });
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| {
        matches!(
            v.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// 截断 SQL 文本（按字符，不截断多字节字符）
fn shorten_sql(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// 为连接安装 SQL profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag(ENV_PERF_SQL).unwrap_or(cfg!(debug_assertions));
    SQL_PROFILING.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(ENV_SLOW_SQL_MS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);

    conn.profile(Some(on_sql_profiled));
}

fn on_sql_profiled(sql: &str, duration: Duration) {
    if !SQL_PROFILING.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    let slow = threshold > 0 && ms >= threshold;
    if slow {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %shorten_sql(sql, 400),
            "slow sql"
        );
    }

    update_counters(|c| {
        if c.depth > 0 {
            c.statements = c.statements.saturating_add(1);
            if slow {
                c.slow = c.slow.saturating_add(1);
            }
        }
    });
}

/// 性能统计 Guard：drop 时输出 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// ```ignore
/// let _perf = troubleshoot_kb::perf::PerfGuard::new("import_execute");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        let mut snapshot = Counters::default();
        update_counters(|c| {
            c.depth = c.depth.saturating_add(1);
            snapshot = *c;
        });
        Self {
            op,
            start: Instant::now(),
            statements_at_start: snapshot.statements,
            slow_at_start: snapshot.slow,
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let mut now = Counters::default();
        update_counters(|c| {
            c.depth = c.depth.saturating_sub(1);
            now = *c;
        });

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count = now.statements.saturating_sub(self.statements_at_start),
            slow_sql_count = now.slow.saturating_sub(self.slow_at_start),
            "done"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_sql_is_char_safe() {
        assert_eq!(shorten_sql("SELECT  1\n FROM t", 100), "SELECT 1 FROM t");
        let s = shorten_sql("SELECT '设备设备设备'", 10);
        assert_eq!(s.chars().count(), 11);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn test_guard_nesting_restores_depth() {
        {
            let _outer = PerfGuard::new("outer");
            let _inner = PerfGuard::new("inner");
            assert_eq!(COUNTERS.with(|c| c.get().depth), 2);
        }
        assert_eq!(COUNTERS.with(|c| c.get().depth), 0);
    }
}
