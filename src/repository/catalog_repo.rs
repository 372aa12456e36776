// ==========================================
// 家具 BOM 成本核算 - 目录组件仓储
// ==========================================
// 红线: 组件记录不做原地修改，只允许累加 times_used
// ==========================================

use crate::domain::component::CatalogComponent;
use crate::domain::types::SubComponent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_datetime, get_datetime, get_decimal, get_parsed};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct CatalogComponentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogComponentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记新组件
    pub fn insert(&self, component: &CatalogComponent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, component)
    }

    /// 在调用方事务内登记
    pub fn insert_in(conn: &Connection, component: &CatalogComponent) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO catalog_component (
                component_id, sub_component, part_name, profile,
                length_mm, width_mm, thickness_mm, cost, times_used, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                &component.component_id,
                component.sub_component.as_str(),
                &component.part_name,
                &component.profile,
                component.length,
                component.width,
                component.thickness,
                component.cost.to_string(),
                component.times_used,
                format_datetime(&component.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, component_id: &str) -> RepositoryResult<Option<CatalogComponent>> {
        let conn = self.get_conn()?;
        let component = conn
            .query_row(
                r#"SELECT component_id, sub_component, part_name, profile,
                          length_mm, width_mm, thickness_mm, cost, times_used, created_at
                   FROM catalog_component
                   WHERE component_id = ?1"#,
                params![component_id],
                map_component_row,
            )
            .optional()?;
        Ok(component)
    }

    /// 查询同材质的候选组件
    pub fn find_by_sub_component(
        &self,
        sub_component: SubComponent,
    ) -> RepositoryResult<Vec<CatalogComponent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT component_id, sub_component, part_name, profile,
                      length_mm, width_mm, thickness_mm, cost, times_used, created_at
               FROM catalog_component
               WHERE sub_component = ?1
               ORDER BY component_id ASC"#,
        )?;
        let components = stmt
            .query_map(params![sub_component.as_str()], map_component_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(components)
    }

    /// 引用次数 +1
    pub fn increment_usage(&self, component_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::increment_usage_in(&conn, component_id)
    }

    /// 在调用方事务内累加
    pub fn increment_usage_in(conn: &Connection, component_id: &str) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE catalog_component SET times_used = times_used + 1 WHERE component_id = ?1",
            params![component_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CatalogComponent".to_string(),
                id: component_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn count(&self) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 =
            conn.query_row("SELECT COUNT(*) FROM catalog_component", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn map_component_row(row: &Row<'_>) -> rusqlite::Result<CatalogComponent> {
    Ok(CatalogComponent {
        component_id: row.get(0)?,
        sub_component: get_parsed(row, 1, SubComponent::parse)?,
        part_name: row.get(2)?,
        profile: row.get(3)?,
        length: row.get(4)?,
        width: row.get(5)?,
        thickness: row.get(6)?,
        cost: get_decimal(row, 7)?,
        times_used: row.get(8)?,
        created_at: get_datetime(row, 9)?,
    })
}
