// ==========================================
// 家具 BOM 成本核算 - 原材料库仓储
// ==========================================

use crate::domain::profile::RawMaterial;
use crate::domain::types::MaterialUnit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{get_decimal, get_parsed};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新原材料
    pub fn upsert(&self, material: &RawMaterial) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO raw_material (material_id, category, name, unit, unit_cost, active)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(material_id) DO UPDATE SET
                   category = excluded.category,
                   name = excluded.name,
                   unit = excluded.unit,
                   unit_cost = excluded.unit_cost,
                   active = excluded.active"#,
            params![
                &material.material_id,
                &material.category,
                &material.name,
                material.unit.as_str(),
                material.unit_cost.to_string(),
                material.active,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, material_id: &str) -> RepositoryResult<Option<RawMaterial>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                r#"SELECT material_id, category, name, unit, unit_cost, active
                   FROM raw_material
                   WHERE material_id = ?1"#,
                params![material_id],
                map_material_row,
            )
            .optional()?;
        Ok(material)
    }

    /// 搜索原材料（编号/名称模糊匹配，可按分类过滤）
    ///
    /// # 参数
    /// - `keyword`: 为空时不过滤
    /// - `category`: 为空时不过滤
    /// - `active_only`: 只返回启用的记录
    pub fn search(
        &self,
        keyword: Option<&str>,
        category: Option<&str>,
        active_only: bool,
    ) -> RepositoryResult<Vec<RawMaterial>> {
        let conn = self.get_conn()?;
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{}%", k));
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let mut stmt = conn.prepare(
            r#"SELECT material_id, category, name, unit, unit_cost, active
               FROM raw_material
               WHERE (?1 IS NULL OR material_id LIKE ?1 OR name LIKE ?1)
                 AND (?2 IS NULL OR category = ?2)
                 AND (?3 = 0 OR active = 1)
               ORDER BY category ASC, material_id ASC"#,
        )?;
        let materials = stmt
            .query_map(params![pattern, category, active_only], map_material_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(materials)
    }
}

fn map_material_row(row: &Row<'_>) -> rusqlite::Result<RawMaterial> {
    Ok(RawMaterial {
        material_id: row.get(0)?,
        category: row.get(1)?,
        name: row.get(2)?,
        unit: get_parsed(row, 3, MaterialUnit::parse)?,
        unit_cost: get_decimal(row, 4)?,
        active: row.get(5)?,
    })
}
