// ==========================================
// 故障知识库 - 批量导入 Repository
// ==========================================
// 事务模型:
// - 整批: 一个 IMMEDIATE 事务（开始即拿写锁，并发导入排队等待 busy_timeout）
// - 单行: SAVEPOINT import_row，失败则 ROLLBACK TO，行内不留部分写入
// - 致命错误: 事务随 Transaction drop 整体回滚
// 红线: Repository 不含业务规则，只做数据写入
// ==========================================

use crate::domain::entry::NewEntry;
use crate::domain::reference::{ReferenceKind, DEFAULT_TOPIC_COLOR};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// EntryImportSink Trait
// ==========================================
// 用途: 导入执行器的写入端（按行开启/结束保存点）
// 实现者: TxImportSink（rusqlite 事务）；单测中为内存实现
pub trait EntryImportSink {
    /// 开始一行（建立保存点）
    fn begin_row(&mut self) -> RepositoryResult<()>;

    /// 结束一行
    ///
    /// # 参数
    /// - keep: true 保留本行写入；false 回滚到行首
    fn finish_row(&mut self, keep: bool) -> RepositoryResult<()>;

    /// 按名称精确查找引用实体（区分大小写）
    fn find_reference(&mut self, kind: ReferenceKind, name: &str) -> RepositoryResult<Option<i64>>;

    /// 以名称创建引用实体，其它字段取默认值
    fn create_reference(&mut self, kind: ReferenceKind, name: &str) -> RepositoryResult<i64>;

    /// 写入条目，返回新 id
    fn insert_entry(&mut self, entry: &NewEntry) -> RepositoryResult<i64>;

    /// 写入标签（重复忽略）
    fn insert_tag(&mut self, entry_id: i64, tag: &str) -> RepositoryResult<()>;
}

// ==========================================
// TxImportSink - 事务内写入端
// ==========================================
pub struct TxImportSink<'t> {
    tx: &'t Transaction<'t>,
    in_row: bool,
}

impl<'t> TxImportSink<'t> {
    fn control(&self, sql: &str) -> RepositoryResult<()> {
        self.tx
            .execute_batch(sql)
            .map_err(|e| RepositoryError::DatabaseTransactionError(format!("{}: {}", sql, e)))
    }
}

impl EntryImportSink for TxImportSink<'_> {
    fn begin_row(&mut self) -> RepositoryResult<()> {
        self.control("SAVEPOINT import_row")?;
        self.in_row = true;
        Ok(())
    }

    fn finish_row(&mut self, keep: bool) -> RepositoryResult<()> {
        if !self.in_row {
            return Err(RepositoryError::DatabaseTransactionError(
                "finish_row without begin_row".to_string(),
            ));
        }
        self.in_row = false;
        if keep {
            self.control("RELEASE import_row")
        } else {
            self.control("ROLLBACK TO import_row; RELEASE import_row")
        }
    }

    fn find_reference(&mut self, kind: ReferenceKind, name: &str) -> RepositoryResult<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE name = ?1 LIMIT 1", kind.table());
        let id = self
            .tx
            .prepare_cached(&sql)?
            .query_row(params![name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    fn create_reference(&mut self, kind: ReferenceKind, name: &str) -> RepositoryResult<i64> {
        match kind {
            ReferenceKind::Equipment => {
                self.tx
                    .prepare_cached("INSERT INTO equipment (name) VALUES (?1)")?
                    .execute(params![name])?;
            }
            ReferenceKind::Topic => {
                self.tx
                    .prepare_cached("INSERT INTO topics (name, color) VALUES (?1, ?2)")?
                    .execute(params![name, DEFAULT_TOPIC_COLOR])?;
            }
        }
        Ok(self.tx.last_insert_rowid())
    }

    fn insert_entry(&mut self, entry: &NewEntry) -> RepositoryResult<i64> {
        self.tx
            .prepare_cached(
                r#"
                INSERT INTO entries (
                    title, question, answer, equipment_id, topic_id,
                    repair_type, severity, source, date_reported, date_resolved
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?
            .execute(params![
                entry.title,
                entry.question,
                entry.answer,
                entry.equipment_id,
                entry.topic_id,
                entry.repair_type,
                entry.severity.as_str(),
                entry.source,
                entry.date_reported.format("%Y-%m-%d").to_string(),
                entry.date_resolved.map(|d| d.format("%Y-%m-%d").to_string()),
            ])?;
        Ok(self.tx.last_insert_rowid())
    }

    fn insert_tag(&mut self, entry_id: i64, tag: &str) -> RepositoryResult<()> {
        self.tx
            .prepare_cached("INSERT OR IGNORE INTO entry_tags (entry_id, tag) VALUES (?1, ?2)")?
            .execute(params![entry_id, tag])?;
        Ok(())
    }
}

// ==========================================
// EntryImportRepository
// ==========================================
pub struct EntryImportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EntryImportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在单个事务中执行一次导入
    ///
    /// # 参数
    /// - run: 导入逻辑，通过 sink 写入
    ///
    /// # 返回
    /// - Ok(T): run 成功且事务已提交
    /// - Err: run 返回的致命错误或提交失败（事务已回滚，无任何写入）
    pub fn run_import<T, F>(&self, run: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut dyn EntryImportSink) -> RepositoryResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(format!("begin: {}", e)))?;

        let result = {
            let mut sink = TxImportSink {
                tx: &tx,
                in_row: false,
            };
            run(&mut sink)
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(format!("commit: {}", e)))?;
                Ok(value)
            }
            Err(err) => {
                tracing::error!(error = %err, "导入失败，事务整体回滚");
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "事务回滚失败");
                }
                Err(err)
            }
        }
    }
}
