// ==========================================
// 家具 BOM 成本核算 - 成本版本仓储
// ==========================================
// 红线: 只追加，不更新不删除
// ==========================================

use crate::domain::cost::CostVersion;
use crate::domain::types::ComplexityLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_datetime, get_datetime, get_decimal};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CostVersionRepository - 成本版本仓储
// ==========================================
pub struct CostVersionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CostVersionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加版本（自动分配版本号）
    ///
    /// 说明：
    /// - 在同一事务内查询 MAX(version) 并写入，保证同一产品的版本号分配原子性
    /// - 同一事务内推进产品的当前复杂度与当前版本号
    /// - 该方法会覆盖传入的 `version.version`
    ///
    /// # 返回
    /// - Ok(u32): 新版本号
    /// - Err(NotFound): 产品不存在
    pub fn append_next_version(&self, version: &mut CostVersion) -> RepositoryResult<u32> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let assigned = Self::append_next_version_in(&tx, version)?;
        tx.commit()?;
        Ok(assigned)
    }

    /// 在调用方事务内追加版本；提交由调用方负责
    pub fn append_next_version_in(tx: &Connection, version: &mut CostVersion) -> RepositoryResult<u32> {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM product WHERE code = ?1",
                params![&version.product_code],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: version.product_code.clone(),
            });
        }

        let max_version: Option<u32> = tx.query_row(
            "SELECT MAX(version) FROM cost_version WHERE product_code = ?1",
            params![&version.product_code],
            |row| row.get(0),
        )?;
        version.version = max_version.unwrap_or(0) + 1;

        tx.execute(
            r#"INSERT INTO cost_version (
                product_code, version, complexity,
                material_cost, labor_cost, overhead, packaging_cost,
                factory_profit, total_cost, selling_price,
                changed_at, changed_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                &version.product_code,
                version.version,
                i64::from(version.complexity),
                version.material_cost.to_string(),
                version.labor_cost.to_string(),
                version.overhead.to_string(),
                version.packaging_cost.to_string(),
                version.factory_profit.to_string(),
                version.total_cost.to_string(),
                version.selling_price.to_string(),
                format_datetime(&version.date),
                &version.changed_by,
            ],
        )?;

        tx.execute(
            "UPDATE product SET complexity = ?1, current_version = ?2 WHERE code = ?3",
            params![
                i64::from(version.complexity),
                version.version,
                &version.product_code
            ],
        )?;

        Ok(version.version)
    }

    /// 查询产品的全部版本（最新在前）
    pub fn list_by_product(&self, product_code: &str) -> RepositoryResult<Vec<CostVersion>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT product_code, version, complexity,
                      material_cost, labor_cost, overhead, packaging_cost,
                      factory_profit, total_cost, selling_price,
                      changed_at, changed_by
               FROM cost_version
               WHERE product_code = ?1
               ORDER BY version DESC"#,
        )?;
        let versions = stmt
            .query_map(params![product_code], map_version_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    /// 查询产品的当前版本（版本号最大者）
    pub fn find_latest(&self, product_code: &str) -> RepositoryResult<Option<CostVersion>> {
        let conn = self.get_conn()?;
        let version = conn
            .query_row(
                r#"SELECT product_code, version, complexity,
                          material_cost, labor_cost, overhead, packaging_cost,
                          factory_profit, total_cost, selling_price,
                          changed_at, changed_by
                   FROM cost_version
                   WHERE product_code = ?1
                   ORDER BY version DESC
                   LIMIT 1"#,
                params![product_code],
                map_version_row,
            )
            .optional()?;
        Ok(version)
    }
}

fn map_version_row(row: &Row<'_>) -> rusqlite::Result<CostVersion> {
    let complexity: i64 = row.get(2)?;
    let complexity = ComplexityLevel::try_from(complexity).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    Ok(CostVersion {
        product_code: row.get(0)?,
        version: row.get(1)?,
        complexity,
        material_cost: get_decimal(row, 3)?,
        labor_cost: get_decimal(row, 4)?,
        overhead: get_decimal(row, 5)?,
        packaging_cost: get_decimal(row, 6)?,
        factory_profit: get_decimal(row, 7)?,
        total_cost: get_decimal(row, 8)?,
        selling_price: get_decimal(row, 9)?,
        date: get_datetime(row, 10)?,
        changed_by: row.get(11)?,
    })
}
