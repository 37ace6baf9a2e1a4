// ==========================================
// 故障知识库 - 导入限额配置
// ==========================================
// 预览行数 / 错误消息上限 / 标题回退长度
// ==========================================

use serde::{Deserialize, Serialize};

/// 预览行数默认值
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// 汇总中保留的行级错误消息上限
pub const DEFAULT_MAX_ERROR_MESSAGES: usize = 20;

/// 标题为空时，从问题截取的字符数
pub const DEFAULT_TITLE_FALLBACK_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLimits {
    pub preview_rows: usize,
    pub max_error_messages: usize,
    pub title_fallback_chars: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_error_messages: DEFAULT_MAX_ERROR_MESSAGES,
            title_fallback_chars: DEFAULT_TITLE_FALLBACK_CHARS,
        }
    }
}
