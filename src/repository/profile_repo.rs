// ==========================================
// 家具 BOM 成本核算 - 型材登记仓储
// ==========================================
// 红线: Repository 不含业务逻辑（状态规则在 domain::profile）
// ==========================================

use crate::domain::profile::Profile;
use crate::domain::types::{ProfileMaterial, ProfileStatus, ProfileType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_datetime, get_datetime, get_parsed};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct ProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProfileRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记型材（编号重复返回 UniqueConstraintViolation）
    pub fn insert(&self, profile: &Profile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, profile)
    }

    /// 在调用方事务内登记
    pub fn insert_in(conn: &Connection, profile: &Profile) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO profile (
                profile_id, material, profile_type, width_mm, height_mm, thickness_mm,
                status, products_using, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                &profile.profile_id,
                profile.material.as_str(),
                profile.profile_type.as_str(),
                profile.width,
                profile.height,
                profile.thickness,
                profile.status.as_str(),
                profile.products_using,
                format_datetime(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 按编号查询
    pub fn find_by_id(&self, profile_id: &str) -> RepositoryResult<Option<Profile>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, profile_id)
    }

    /// 在调用方事务内查询
    pub fn find_by_id_in(conn: &Connection, profile_id: &str) -> RepositoryResult<Option<Profile>> {
        let profile = conn
            .query_row(
                r#"SELECT profile_id, material, profile_type, width_mm, height_mm, thickness_mm,
                          status, products_using, updated_at
                   FROM profile
                   WHERE profile_id = ?1"#,
                params![profile_id],
                map_profile_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// 查询全部型材（可按状态过滤；使用产品数降序）
    pub fn list(&self, status: Option<ProfileStatus>) -> RepositoryResult<Vec<Profile>> {
        let conn = self.get_conn()?;
        Self::list_in(&conn, status)
    }

    /// 在调用方事务内查询
    pub fn list_in(conn: &Connection, status: Option<ProfileStatus>) -> RepositoryResult<Vec<Profile>> {
        let mut stmt = conn.prepare(
            r#"SELECT profile_id, material, profile_type, width_mm, height_mm, thickness_mm,
                      status, products_using, updated_at
               FROM profile
               WHERE ?1 IS NULL OR status = ?1
               ORDER BY products_using DESC, profile_id ASC"#,
        )?;
        let profiles = stmt
            .query_map(params![status.map(|s| s.as_str())], map_profile_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// 更新状态
    pub fn update_status(&self, profile_id: &str, status: ProfileStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE profile SET status = ?1, updated_at = ?2 WHERE profile_id = ?3",
            params![status.as_str(), format_datetime(&Utc::now()), profile_id],
        )?;
        ensure_found(affected, profile_id)
    }

    /// 使用产品数 +1
    pub fn increment_usage(&self, profile_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::increment_usage_in(&conn, profile_id)
    }

    /// 在调用方事务内累加
    pub fn increment_usage_in(conn: &Connection, profile_id: &str) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE profile SET products_using = products_using + 1, updated_at = ?1 WHERE profile_id = ?2",
            params![format_datetime(&Utc::now()), profile_id],
        )?;
        ensure_found(affected, profile_id)
    }

    /// 删除型材（仅当无产品使用）
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 仍被使用，未删除
    pub fn delete_unused(&self, profile_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM profile WHERE profile_id = ?1 AND products_using = 0",
            params![profile_id],
        )?;
        Ok(affected > 0)
    }

    /// 各状态数量 (total, produced)
    pub fn count_produced(&self) -> RepositoryResult<(u64, u64)> {
        let conn = self.get_conn()?;
        let (total, produced): (i64, i64) = conn.query_row(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(CASE WHEN status = 'PRODUCED' THEN 1 ELSE 0 END), 0)
               FROM profile"#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((total as u64, produced as u64))
    }
}

fn ensure_found(affected: usize, profile_id: &str) -> RepositoryResult<()> {
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Profile".to_string(),
            id: profile_id.to_string(),
        });
    }
    Ok(())
}

fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        profile_id: row.get(0)?,
        material: get_parsed(row, 1, ProfileMaterial::parse)?,
        profile_type: get_parsed(row, 2, ProfileType::parse)?,
        width: row.get(3)?,
        height: row.get(4)?,
        thickness: row.get(5)?,
        status: ProfileStatus::from_str(&row.get::<_, String>(6)?),
        products_using: row.get(7)?,
        updated_at: get_datetime(row, 8)?,
    })
}
