// ==========================================
// 故障知识库 - 应用配置
// ==========================================
// 来源: 环境变量（缺省或非法时回落为默认值并告警）
// - TROUBLESHOOT_KB_DB_PATH
// - TROUBLESHOOT_KB_UPLOAD_DIR
// - TROUBLESHOOT_KB_MAX_UPLOAD_BYTES
// ==========================================

use crate::config::import_limits::ImportLimits;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TROUBLESHOOT_KB_DB_PATH";
pub const ENV_UPLOAD_DIR: &str = "TROUBLESHOOT_KB_UPLOAD_DIR";
pub const ENV_MAX_UPLOAD_BYTES: &str = "TROUBLESHOOT_KB_MAX_UPLOAD_BYTES";

/// 上传文件大小上限默认值（10 MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const APP_DIR_NAME: &str = "troubleshoot-kb";
const DB_FILE_NAME: &str = "knowledge_base.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub import_limits: ImportLimits,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置（测试时可注入）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = non_empty(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let upload_dir = non_empty(ENV_UPLOAD_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_upload_dir);

        let max_upload_bytes = match non_empty(ENV_MAX_UPLOAD_BYTES) {
            None => DEFAULT_MAX_UPLOAD_BYTES,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => v,
                _ => {
                    tracing::warn!(
                        key = ENV_MAX_UPLOAD_BYTES,
                        value = %raw,
                        default = DEFAULT_MAX_UPLOAD_BYTES,
                        "配置值非法，使用默认值"
                    );
                    DEFAULT_MAX_UPLOAD_BYTES
                }
            },
        };

        Self {
            db_path,
            upload_dir,
            max_upload_bytes,
            import_limits: ImportLimits::default(),
        }
    }

    /// 指定数据目录的配置（测试/嵌入场景）
    pub fn with_paths(db_path: impl Into<PathBuf>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            upload_dir: upload_dir.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            import_limits: ImportLimits::default(),
        }
    }
}

/// 默认数据库路径: <data_dir>/troubleshoot-kb/knowledge_base.db
pub fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

/// 默认上传目录: <tmp>/troubleshoot-kb-uploads
pub fn default_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("{}-uploads", APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.db_path.ends_with(DB_FILE_NAME));
        assert_eq!(config.import_limits.preview_rows, 5);
        assert_eq!(config.import_limits.max_error_messages, 20);
    }

    #[test]
    fn test_env_overrides_and_invalid_fallback() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/tmp/kb.db"),
            (ENV_UPLOAD_DIR, "/tmp/up"),
            (ENV_MAX_UPLOAD_BYTES, "not-a-number"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/kb.db"));
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);

        let config = AppConfig::from_lookup(lookup_from(&[(ENV_MAX_UPLOAD_BYTES, "2048")]));
        assert_eq!(config.max_upload_bytes, 2048);
    }
}
