// ==========================================
// 故障知识库 - 检索与统计看板 API
// ==========================================
// 职责: 关键词检索 / 汇总计数 / 高频问题 / 趋势分布
// 约束: 只读
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::dashboard::{DashboardStats, FrequentIssue, TrendReport};
use crate::domain::search::{SearchQuery, SearchResults};
use crate::repository::dashboard_repo::{
    DashboardRepository, DEFAULT_FREQUENT_LIMIT, DEFAULT_TREND_DAYS,
};
use crate::repository::search_repo::SearchRepository;
use std::sync::Arc;
use tracing::debug;

/// 趋势窗口上限（天）
const MAX_TREND_DAYS: u32 = 3650;

// ==========================================
// SearchApi
// ==========================================
pub struct SearchApi {
    search_repo: Arc<SearchRepository>,
}

impl SearchApi {
    pub fn new(search_repo: Arc<SearchRepository>) -> Self {
        Self { search_repo }
    }

    /// 关键词检索
    ///
    /// # 返回
    /// - Ok(SearchResults): `{results, total}`，空关键词时为过滤列表
    /// - Err(ApiError::InvalidInput): date_from 晚于 date_to
    pub fn search(&self, query: &SearchQuery) -> ApiResult<SearchResults> {
        if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
            if from > to {
                return Err(ApiError::InvalidInput(format!(
                    "date_from {} is after date_to {}",
                    from, to
                )));
            }
        }

        let results = self.search_repo.search(query)?;
        debug!(terms = query.terms().len(), total = results.total, "检索完成");
        Ok(results)
    }
}

// ==========================================
// DashboardApi
// ==========================================
pub struct DashboardApi {
    dashboard_repo: Arc<DashboardRepository>,
}

impl DashboardApi {
    pub fn new(dashboard_repo: Arc<DashboardRepository>) -> Self {
        Self { dashboard_repo }
    }

    pub fn stats(&self) -> ApiResult<DashboardStats> {
        Ok(self.dashboard_repo.stats()?)
    }

    /// 高频问题
    ///
    /// # 参数
    /// - limit: 条数（缺省 10）
    pub fn frequent_issues(&self, limit: Option<u32>) -> ApiResult<Vec<FrequentIssue>> {
        let limit = limit.unwrap_or(DEFAULT_FREQUENT_LIMIT).max(1);
        Ok(self.dashboard_repo.frequent_issues(limit)?)
    }

    /// 趋势与分布
    ///
    /// # 参数
    /// - days: 窗口天数（缺省 90）
    pub fn trends(&self, days: Option<u32>) -> ApiResult<TrendReport> {
        let days = days.unwrap_or(DEFAULT_TREND_DAYS).clamp(1, MAX_TREND_DAYS);
        Ok(self.dashboard_repo.trends(days)?)
    }
}
