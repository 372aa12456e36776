// ==========================================
// 家具 BOM 成本核算 - 产品数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 表: product / product_line / actual_cost
// ==========================================

use crate::domain::component::ComponentLine;
use crate::domain::product::{
    format_product_code, ActualCostRecord, PackagingDims, Product, ProductListing,
};
use crate::domain::types::{ComplexityLevel, ProductStatus, SubComponent};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    format_datetime, get_datetime, get_decimal, get_optional_decimal, get_parsed,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// 带单件成本的组件行
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLine {
    pub line: ComponentLine,
    pub unit_cost: Decimal,
}

// ==========================================
// ProductRepository - 产品仓储
// ==========================================
/// 职责: 管理 product / product_line / actual_cost 表
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建产品（自动分配编码）
    ///
    /// 说明：
    /// - 在同一事务内查询前缀下的最大序号并写入，保证编码分配原子性
    /// - 该方法会覆盖传入的 `product.code`
    ///
    /// # 参数
    /// - `product`: 产品（components 字段忽略，以 `lines` 为准）
    /// - `prefix`: 编码前缀，如 "SICILY"
    /// - `lines`: 有序组件行及单件成本
    pub fn create_with_next_code(
        &self,
        product: &mut Product,
        prefix: &str,
        lines: &[StoredLine],
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let code = Self::create_with_next_code_in(&tx, product, prefix, lines)?;
        tx.commit()?;
        Ok(code)
    }

    /// 在调用方事务内创建产品；提交由调用方负责
    pub fn create_with_next_code_in(
        tx: &Connection,
        product: &mut Product,
        prefix: &str,
        lines: &[StoredLine],
    ) -> RepositoryResult<String> {
        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT code FROM product WHERE code LIKE ?1")?;
            let rows = stmt
                .query_map(params![format!("{}-%", prefix)], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        let max_seq = existing
            .iter()
            .filter_map(|code| code.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        product.code = format_product_code(prefix, max_seq + 1);

        tx.execute(
            r#"INSERT INTO product (
                code, name, product_type, main_material,
                pkg_length_cm, pkg_width_cm, pkg_height_cm,
                complexity, current_version, status, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                &product.code,
                &product.name,
                &product.product_type,
                &product.main_material,
                product.packaging.length,
                product.packaging.width,
                product.packaging.height,
                i64::from(product.complexity),
                product.current_version,
                product.status.as_str(),
                &product.created_by,
                format_datetime(&product.created_at),
            ],
        )?;

        for (seq_no, stored) in lines.iter().enumerate() {
            let line = &stored.line;
            tx.execute(
                r#"INSERT INTO product_line (
                    product_code, seq_no, main_component, sub_component, part_name, profile,
                    length_mm, width_mm, thickness_mm, quantity,
                    density, weight_kg, total_weight_kg, note, component_id, unit_cost
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"#,
                params![
                    &product.code,
                    seq_no as i64,
                    &line.main_component,
                    line.sub_component.as_str(),
                    &line.part_name,
                    &line.profile,
                    line.length,
                    line.width,
                    line.thickness,
                    line.quantity,
                    line.density,
                    line.weight,
                    line.total_weight,
                    &line.note,
                    &line.component_id,
                    stored.unit_cost.to_string(),
                ],
            )?;
        }

        product.components = lines.iter().map(|s| s.line.clone()).collect();
        Ok(product.code.clone())
    }

    /// 按编码查询产品（含组件行）
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                r#"SELECT code, name, product_type, main_material,
                          pkg_length_cm, pkg_width_cm, pkg_height_cm,
                          complexity, current_version, status, created_by, created_at
                   FROM product WHERE code = ?1"#,
                params![code],
                map_product_row,
            )
            .optional()?;

        match product {
            Some(mut product) => {
                product.components = Self::load_lines(&conn, code)?
                    .into_iter()
                    .map(|s| s.line)
                    .collect();
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    /// 产品是否存在
    pub fn exists(&self, code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM product WHERE code = ?1", params![code], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// 产品列表（附当前成本版本金额，按创建时间倒序）
    pub fn list_with_latest_cost(&self) -> RepositoryResult<Vec<ProductListing>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT p.code, p.name, p.product_type, p.main_material,
                      p.complexity, p.current_version, p.status,
                      v.material_cost, v.total_cost, v.selling_price, p.created_at
               FROM product p
               LEFT JOIN cost_version v
                 ON v.product_code = p.code
                AND v.version = (SELECT MAX(version) FROM cost_version WHERE product_code = p.code)
               ORDER BY p.created_at DESC, p.code ASC"#,
        )?;
        let listings = stmt
            .query_map([], map_listing_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    /// 查询产品的组件行（含单件成本）
    pub fn find_lines(&self, code: &str) -> RepositoryResult<Vec<StoredLine>> {
        let conn = self.get_conn()?;
        Self::load_lines(&conn, code)
    }

    fn load_lines(conn: &Connection, code: &str) -> RepositoryResult<Vec<StoredLine>> {
        let mut stmt = conn.prepare(
            r#"SELECT main_component, sub_component, part_name, profile,
                      length_mm, width_mm, thickness_mm, quantity,
                      density, weight_kg, total_weight_kg, note, component_id, unit_cost
               FROM product_line
               WHERE product_code = ?1
               ORDER BY seq_no ASC"#,
        )?;
        let lines = stmt
            .query_map(params![code], map_line_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// 产品总数
    pub fn count(&self) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM product", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// 指定时间之后创建的产品数
    pub fn count_created_since(&self, since: DateTime<Utc>) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM product WHERE created_at >= ?1",
            params![format_datetime(&since)],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// 更新产品状态
    pub fn update_status(&self, code: &str, status: ProductStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE product SET status = ?1 WHERE code = ?2",
            params![status.as_str(), code],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: code.to_string(),
            });
        }
        Ok(())
    }

    // ===== 实际报价 =====

    /// 记录工厂实际报价
    pub fn insert_actual_cost(&self, record: &ActualCostRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO actual_cost (
                record_id, product_code, actual_cost, estimated_cost, entered_by, entered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &record.record_id,
                &record.product_code,
                record.actual_cost.to_string(),
                record.estimated_cost.to_string(),
                &record.entered_by,
                format_datetime(&record.entered_at),
            ],
        )?;
        Ok(())
    }

    /// 查询实际报价（product_code 为空时查询全部，最新在前）
    pub fn list_actual_costs(
        &self,
        product_code: Option<&str>,
    ) -> RepositoryResult<Vec<ActualCostRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT record_id, product_code, actual_cost, estimated_cost, entered_by, entered_at
               FROM actual_cost
               WHERE ?1 IS NULL OR product_code = ?1
               ORDER BY entered_at DESC"#,
        )?;
        let records = stmt
            .query_map(params![product_code], |row| {
                Ok(ActualCostRecord {
                    record_id: row.get(0)?,
                    product_code: row.get(1)?,
                    actual_cost: get_decimal(row, 2)?,
                    estimated_cost: get_decimal(row, 3)?,
                    entered_by: row.get(4)?,
                    entered_at: get_datetime(row, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let complexity: i64 = row.get(7)?;
    Ok(Product {
        code: row.get(0)?,
        name: row.get(1)?,
        product_type: row.get(2)?,
        main_material: row.get(3)?,
        packaging: PackagingDims::new(row.get(4)?, row.get(5)?, row.get(6)?),
        components: Vec::new(),
        complexity: ComplexityLevel::try_from(complexity).unwrap_or_default(),
        current_version: row.get(8)?,
        status: ProductStatus::from_str(&row.get::<_, String>(9)?),
        created_by: row.get(10)?,
        created_at: get_datetime(row, 11)?,
    })
}

fn map_listing_row(row: &Row<'_>) -> rusqlite::Result<ProductListing> {
    let complexity: i64 = row.get(4)?;
    Ok(ProductListing {
        code: row.get(0)?,
        name: row.get(1)?,
        product_type: row.get(2)?,
        main_material: row.get(3)?,
        complexity: ComplexityLevel::try_from(complexity).unwrap_or_default(),
        current_version: row.get(5)?,
        status: ProductStatus::from_str(&row.get::<_, String>(6)?),
        material_cost: get_optional_decimal(row, 7)?,
        total_cost: get_optional_decimal(row, 8)?,
        selling_price: get_optional_decimal(row, 9)?,
        created_at: get_datetime(row, 10)?,
    })
}

fn map_line_row(row: &Row<'_>) -> rusqlite::Result<StoredLine> {
    Ok(StoredLine {
        line: ComponentLine {
            main_component: row.get(0)?,
            sub_component: get_parsed(row, 1, SubComponent::parse)?,
            part_name: row.get(2)?,
            profile: row.get(3)?,
            length: row.get(4)?,
            width: row.get(5)?,
            thickness: row.get(6)?,
            quantity: row.get(7)?,
            m: None,
            m2: None,
            m3: None,
            density: row.get(8)?,
            weight: row.get(9)?,
            total_weight: row.get(10)?,
            note: row.get(11)?,
            component_id: row.get(12)?,
        },
        unit_cost: get_decimal(row, 13)?,
    })
}
