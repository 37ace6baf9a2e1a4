// ==========================================
// 故障知识库 - 设备 / 主题 API
// ==========================================
// 设备名不唯一；主题名唯一（重名 → 409）
// 删除时引用条目的外键置 NULL
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::reference::{Equipment, EquipmentInput, Topic, TopicInput};
use crate::repository::equipment_repo::EquipmentRepository;
use crate::repository::topic_repo::TopicRepository;
use std::sync::Arc;
use tracing::info;

fn require_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("name is required".to_string()));
    }
    Ok(())
}

// ==========================================
// EquipmentApi
// ==========================================
pub struct EquipmentApi {
    equipment_repo: Arc<EquipmentRepository>,
}

impl EquipmentApi {
    pub fn new(equipment_repo: Arc<EquipmentRepository>) -> Self {
        Self { equipment_repo }
    }

    pub fn list(&self) -> ApiResult<Vec<Equipment>> {
        Ok(self.equipment_repo.list()?)
    }

    pub fn get(&self, id: i64) -> ApiResult<Equipment> {
        self.equipment_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Equipment", id))
    }

    pub fn create(&self, input: &EquipmentInput) -> ApiResult<Equipment> {
        require_name(&input.name)?;
        let id = self.equipment_repo.insert(input)?;
        info!(equipment_id = id, name = input.name.trim(), "设备已创建");
        self.get(id)
    }

    pub fn update(&self, id: i64, input: &EquipmentInput) -> ApiResult<Equipment> {
        require_name(&input.name)?;
        if !self.equipment_repo.update(id, input)? {
            return Err(ApiError::not_found("Equipment", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> ApiResult<()> {
        if !self.equipment_repo.delete(id)? {
            return Err(ApiError::not_found("Equipment", id));
        }
        Ok(())
    }
}

// ==========================================
// TopicApi
// ==========================================
pub struct TopicApi {
    topic_repo: Arc<TopicRepository>,
}

impl TopicApi {
    pub fn new(topic_repo: Arc<TopicRepository>) -> Self {
        Self { topic_repo }
    }

    pub fn list(&self) -> ApiResult<Vec<Topic>> {
        Ok(self.topic_repo.list()?)
    }

    pub fn get(&self, id: i64) -> ApiResult<Topic> {
        self.topic_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Topic", id))
    }

    /// 新建主题
    ///
    /// # 返回
    /// - Err(ApiError::Conflict): 名称已存在
    pub fn create(&self, input: &TopicInput) -> ApiResult<Topic> {
        require_name(&input.name)?;
        let id = self.topic_repo.insert(input)?;
        info!(topic_id = id, name = input.name.trim(), "主题已创建");
        self.get(id)
    }

    pub fn update(&self, id: i64, input: &TopicInput) -> ApiResult<Topic> {
        require_name(&input.name)?;
        if !self.topic_repo.update(id, input)? {
            return Err(ApiError::not_found("Topic", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> ApiResult<()> {
        if !self.topic_repo.delete(id)? {
            return Err(ApiError::not_found("Topic", id));
        }
        Ok(())
    }
}
