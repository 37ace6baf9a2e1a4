// ==========================================
// 故障知识库 - 设备数据仓储
// ==========================================
// 表: equipment（name 不唯一）
// 删除设备时条目 equipment_id 由外键置 NULL
// ==========================================

use crate::domain::reference::{Equipment, EquipmentInput};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::parse_timestamp;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const EQUIPMENT_SELECT: &str = r#"
    SELECT e.id, e.name, e.model, e.manufacturer, e.category, e.created_at,
           (SELECT COUNT(*) FROM entries WHERE equipment_id = e.id) AS entry_count
    FROM equipment e
"#;

pub struct EquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EquipmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<Equipment> {
        let created_at: String = row.get(5)?;
        Ok(Equipment {
            id: row.get(0)?,
            name: row.get(1)?,
            model: row.get(2)?,
            manufacturer: row.get(3)?,
            category: row.get(4)?,
            created_at: parse_timestamp(5, &created_at)?,
            entry_count: row.get(6)?,
        })
    }

    /// 全部设备（按名称排序，含条目数）
    pub fn list(&self) -> RepositoryResult<Vec<Equipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY e.name, e.id", EQUIPMENT_SELECT))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Equipment>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                &format!("{} WHERE e.id = ?1", EQUIPMENT_SELECT),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(found)
    }

    /// 新建设备，返回 id
    pub fn insert(&self, input: &EquipmentInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO equipment (name, model, manufacturer, category) VALUES (?1, ?2, ?3, ?4)",
            params![
                input.name.trim(),
                input.model.as_deref().unwrap_or(""),
                input.manufacturer.as_deref().unwrap_or(""),
                input.category.as_deref().unwrap_or(""),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 整体更新（未提供的可选字段置空串）
    ///
    /// # 返回
    /// - `Ok(false)`: 设备不存在
    pub fn update(&self, id: i64, input: &EquipmentInput) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE equipment SET name = ?1, model = ?2, manufacturer = ?3, category = ?4 WHERE id = ?5",
            params![
                input.name.trim(),
                input.model.as_deref().unwrap_or(""),
                input.manufacturer.as_deref().unwrap_or(""),
                input.category.as_deref().unwrap_or(""),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM equipment WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<Mutex<Connection>>, EquipmentRepository) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        (conn.clone(), EquipmentRepository::new(conn))
    }

    fn input(name: &str) -> EquipmentInput {
        EquipmentInput {
            name: name.to_string(),
            model: Some("X-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_crud_and_entry_count() {
        let (conn, repo) = setup();
        let id = repo.insert(&input("Compressor")).unwrap();
        repo.insert(&input("Boiler")).unwrap();

        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO entries (title, question, answer, equipment_id) VALUES ('t','q','a',?1)",
                [id],
            )
            .unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all[0].name, "Boiler");
        assert_eq!(all[1].entry_count, 1);
        assert_eq!(all[1].model, "X-1");
        assert_eq!(all[1].manufacturer, "");

        assert!(repo.update(id, &input("Compressor B")).unwrap());
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().name, "Compressor B");
        assert!(!repo.update(999, &input("none")).unwrap());
    }

    #[test]
    fn test_delete_nulls_entry_reference() {
        let (conn, repo) = setup();
        let id = repo.insert(&input("Mixer")).unwrap();
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO entries (title, question, answer, equipment_id) VALUES ('t','q','a',?1)",
                [id],
            )
            .unwrap();

        assert!(repo.delete(id).unwrap());
        assert!(!repo.delete(id).unwrap());

        let equipment_id: Option<i64> = conn
            .lock()
            .unwrap()
            .query_row("SELECT equipment_id FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(equipment_id, None);
    }
}
