// ==========================================
// 故障知识库 - 知识条目 API
// ==========================================
// 职责: 条目增删改查 + 发生记录
// 校验: title / question / answer 必填；标签 TRIM 去空去重
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::entry::{
    normalize_tags, EntryDetail, EntryInput, EntryListQuery, EntryPage, EntryPatch, NewEntry,
    Occurrence,
};
use crate::repository::entry_repo::EntryRepository;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 发生记录请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccurrenceInput {
    #[serde(default)]
    pub reported_by: String,
    #[serde(default)]
    pub notes: String,
}

/// 条目API
pub struct EntryApi {
    entry_repo: Arc<EntryRepository>,
}

fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn trimmed(value: Option<&String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl EntryApi {
    pub fn new(entry_repo: Arc<EntryRepository>) -> Self {
        Self { entry_repo }
    }

    /// 分页查询
    pub fn list(&self, query: &EntryListQuery) -> ApiResult<EntryPage> {
        Ok(self.entry_repo.list(query)?)
    }

    /// 查询详情
    ///
    /// # 返回
    /// - Err(ApiError::NotFound): 条目不存在
    pub fn get(&self, id: i64) -> ApiResult<EntryDetail> {
        self.entry_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Entry", id))
    }

    /// 新建条目
    ///
    /// # 参数
    /// - input: 请求体（未给出的可选字段取默认值）
    ///
    /// # 返回
    /// - Ok(EntryDetail): 新条目详情
    /// - Err(ApiError::InvalidInput): 必填字段为空
    /// - Err(ApiError::InvalidReference): equipment_id / topic_id 不存在
    pub fn create(&self, input: &EntryInput) -> ApiResult<EntryDetail> {
        require("title", &input.title)?;
        require("question", &input.question)?;
        require("answer", &input.answer)?;

        let entry = NewEntry {
            title: input.title.trim().to_string(),
            question: input.question.trim().to_string(),
            answer: input.answer.trim().to_string(),
            equipment_id: input.equipment_id,
            topic_id: input.topic_id,
            repair_type: trimmed(input.repair_type.as_ref()),
            severity: input.severity.unwrap_or_default(),
            source: trimmed(input.source.as_ref()),
            date_reported: input
                .date_reported
                .unwrap_or_else(|| Local::now().date_naive()),
            date_resolved: input.date_resolved,
        };
        let tags = normalize_tags(&input.tags);

        let id = self.entry_repo.insert(&entry, &tags)?;
        info!(entry_id = id, tags = tags.len(), "条目已创建");
        self.get(id)
    }

    /// 部分更新
    ///
    /// # 返回
    /// - Ok(EntryDetail): 更新后的详情
    /// - Err(ApiError::NotFound): 条目不存在
    pub fn update(&self, id: i64, patch: &EntryPatch) -> ApiResult<EntryDetail> {
        for (field, value) in [
            ("title", &patch.title),
            ("question", &patch.question),
            ("answer", &patch.answer),
        ] {
            if let Some(v) = value {
                require(field, v)?;
            }
        }

        let mut patch = patch.clone();
        patch.tags = patch.tags.map(normalize_tags);

        if !self.entry_repo.update(id, &patch)? {
            return Err(ApiError::not_found("Entry", id));
        }
        self.get(id)
    }

    /// 删除条目（级联删除标签与发生记录）
    pub fn delete(&self, id: i64) -> ApiResult<()> {
        if !self.entry_repo.delete(id)? {
            return Err(ApiError::not_found("Entry", id));
        }
        info!(entry_id = id, "条目已删除");
        Ok(())
    }

    /// 记录一次重复发生
    pub fn log_occurrence(&self, id: i64, input: &OccurrenceInput) -> ApiResult<Occurrence> {
        self.entry_repo
            .log_occurrence(id, input.reported_by.trim(), input.notes.trim())?
            .ok_or_else(|| ApiError::not_found("Entry", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Severity;
    use std::sync::Mutex;

    fn setup() -> EntryApi {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        EntryApi::new(Arc::new(EntryRepository::new(conn)))
    }

    fn input() -> EntryInput {
        EntryInput {
            title: " Conveyor stops ".to_string(),
            question: "Belt halts randomly".to_string(),
            answer: "Replace proximity sensor".to_string(),
            tags: vec!["sensor".to_string(), " sensor ".to_string(), "".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let api = setup();
        let detail = api.create(&input()).unwrap();

        assert_eq!(detail.entry.title, "Conveyor stops");
        assert_eq!(detail.entry.severity, Severity::Medium);
        assert_eq!(detail.entry.date_reported, Some(Local::now().date_naive()));
        assert_eq!(detail.entry.tags, vec!["sensor"]);
    }

    #[test]
    fn test_create_requires_answer() {
        let api = setup();
        let mut bad = input();
        bad.answer = "   ".to_string();

        let err = api.create(&bad).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert!(err.to_string().contains("answer"));
    }

    #[test]
    fn test_update_delete_and_occurrence_not_found() {
        let api = setup();
        let id = api.create(&input()).unwrap().entry.id;

        let blank = EntryPatch {
            title: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(api.update(id, &blank).unwrap_err().http_status(), 400);
        assert_eq!(
            api.update(999, &EntryPatch::default()).unwrap_err().http_status(),
            404
        );

        let occurrence = api
            .log_occurrence(id, &OccurrenceInput {
                reported_by: "ops".to_string(),
                notes: String::new(),
            })
            .unwrap();
        assert_eq!(occurrence.entry_id, id);

        api.delete(id).unwrap();
        assert_eq!(api.delete(id).unwrap_err().http_status(), 404);
        assert_eq!(
            api.log_occurrence(id, &OccurrenceInput::default())
                .unwrap_err()
                .http_status(),
            404
        );
    }
}
