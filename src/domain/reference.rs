// ==========================================
// 故障知识库 - 引用实体 (设备 / 主题)
// ==========================================
// equipment.name 不唯一；topics.name 唯一
// 删除引用实体时，条目上的外键置 NULL
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 主题默认颜色（灰）
pub const DEFAULT_TOPIC_COLOR: &str = "#6B7280";

/// 可按名称解析的引用实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Equipment,
    Topic,
}

impl ReferenceKind {
    /// 对应的数据表名（仅内部常量，不接受外部输入）
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Equipment => "equipment",
            ReferenceKind::Topic => "topics",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Equipment => write!(f, "equipment"),
            ReferenceKind::Topic => write!(f, "topic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub category: String,
    pub created_at: NaiveDateTime,
    pub entry_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentInput {
    #[serde(default)]
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: NaiveDateTime,
    pub entry_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicInput {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}
