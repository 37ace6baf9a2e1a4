// ==========================================
// 故障知识库 - 引用解析器（设备 / 主题）
// ==========================================
// 名称 → id，不存在则创建
// 缓存归属于一次导入运行，不跨运行共享
// 行被回滚时，本行新建的缓存项一并撤销
// ==========================================

use crate::domain::reference::ReferenceKind;
use crate::repository::entry_import_repo::EntryImportSink;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache: HashMap<(ReferenceKind, String), i64>,
    /// 当前行内新加入缓存的键（行回滚时撤销）
    pending: Vec<(ReferenceKind, String)>,
    lookups: usize,
    created: usize,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析名称
    ///
    /// # 返回
    /// - Ok(None): 名称 TRIM 后为空
    /// - Ok(Some(id)): 命中缓存 / 查到已有记录 / 新建记录
    pub fn resolve(
        &mut self,
        sink: &mut dyn EntryImportSink,
        kind: ReferenceKind,
        raw_name: &str,
    ) -> RepositoryResult<Option<i64>> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let key = (kind, name.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        self.lookups += 1;
        let id = match sink.find_reference(kind, name)? {
            Some(id) => id,
            None => {
                let id = sink.create_reference(kind, name)?;
                self.created += 1;
                tracing::debug!(kind = %kind, name = %name, id, "新建引用实体");
                id
            }
        };

        self.cache.insert(key.clone(), id);
        self.pending.push(key);
        Ok(Some(id))
    }

    /// 行写入已保留
    pub fn commit_row(&mut self) {
        self.pending.clear();
    }

    /// 行写入已回滚：本行解析到的缓存项可能指向已撤销的记录
    pub fn rollback_row(&mut self) {
        for key in self.pending.drain(..) {
            self.cache.remove(&key);
        }
    }

    /// 查库次数（缓存未命中次数）
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// 新建次数
    pub fn created(&self) -> usize {
        self.created
    }
}
