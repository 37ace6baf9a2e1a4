// ==========================================
// 故障知识库 - 统计看板读模型
// ==========================================

use crate::domain::types::{Severity, Trend};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_entries: i64,
    pub total_equipment: i64,
    pub total_topics: i64,
    /// 最近 30 天上报的条目数（按 date_reported）
    pub entries_this_month: i64,
    pub total_occurrences: i64,
}

/// 高频问题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentIssue {
    pub entry_id: i64,
    pub title: String,
    pub severity: Severity,
    pub equipment_name: String,
    pub topic_name: String,
    pub topic_color: Option<String>,
    pub occurrence_count: i64,
    /// 最近 30 天
    pub recent_count: i64,
    /// 30~60 天前
    pub previous_count: i64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub occurrence_trend: Vec<DailyCount>,
    pub entry_trend: Vec<DailyCount>,
    pub equipment_breakdown: Vec<BreakdownItem>,
    pub topic_breakdown: Vec<BreakdownItem>,
    pub severity_breakdown: Vec<BreakdownItem>,
}
