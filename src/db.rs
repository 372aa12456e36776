// ==========================================
// 家具 BOM 成本核算 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等的建表入口（应用启动 / 测试 / 种子数据共用）
// ==========================================
// 金额字段以 TEXT 保存 Decimal 的字符串形式，避免 REAL 精度损失
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ===== 配置 =====
        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- ===== 产品 / BOM =====
        CREATE TABLE IF NOT EXISTS product (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            product_type TEXT NOT NULL DEFAULT '',
            main_material TEXT NOT NULL DEFAULT '',
            pkg_length_cm REAL NOT NULL DEFAULT 0,
            pkg_width_cm REAL NOT NULL DEFAULT 0,
            pkg_height_cm REAL NOT NULL DEFAULT 0,
            complexity INTEGER NOT NULL DEFAULT 3,
            current_version INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'COSTED',
            created_by TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_line (
            product_code TEXT NOT NULL REFERENCES product(code) ON DELETE CASCADE,
            seq_no INTEGER NOT NULL,
            main_component TEXT NOT NULL DEFAULT '',
            sub_component TEXT NOT NULL,
            part_name TEXT NOT NULL DEFAULT '',
            profile TEXT,
            length_mm REAL,
            width_mm REAL,
            thickness_mm REAL,
            quantity INTEGER NOT NULL DEFAULT 1,
            density REAL,
            weight_kg REAL,
            total_weight_kg REAL,
            note TEXT,
            component_id TEXT,
            unit_cost TEXT NOT NULL DEFAULT '0',
            PRIMARY KEY (product_code, seq_no)
        );

        CREATE TABLE IF NOT EXISTS cost_version (
            product_code TEXT NOT NULL REFERENCES product(code) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            complexity INTEGER NOT NULL,
            material_cost TEXT NOT NULL,
            labor_cost TEXT NOT NULL,
            overhead TEXT NOT NULL,
            packaging_cost TEXT NOT NULL,
            factory_profit TEXT NOT NULL,
            total_cost TEXT NOT NULL,
            selling_price TEXT NOT NULL,
            changed_at TEXT NOT NULL,
            changed_by TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (product_code, version)
        );

        CREATE TABLE IF NOT EXISTS actual_cost (
            record_id TEXT PRIMARY KEY,
            product_code TEXT NOT NULL REFERENCES product(code) ON DELETE CASCADE,
            actual_cost TEXT NOT NULL,
            estimated_cost TEXT NOT NULL,
            entered_by TEXT NOT NULL DEFAULT '',
            entered_at TEXT NOT NULL
        );

        -- ===== 目录组件 =====
        CREATE TABLE IF NOT EXISTS catalog_component (
            component_id TEXT PRIMARY KEY,
            sub_component TEXT NOT NULL,
            part_name TEXT NOT NULL DEFAULT '',
            profile TEXT,
            length_mm REAL,
            width_mm REAL,
            thickness_mm REAL,
            cost TEXT NOT NULL DEFAULT '0',
            times_used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_catalog_component_sub
            ON catalog_component(sub_component);

        -- ===== 型材 / 原材料 =====
        CREATE TABLE IF NOT EXISTS profile (
            profile_id TEXT PRIMARY KEY,
            material TEXT NOT NULL,
            profile_type TEXT NOT NULL,
            width_mm REAL NOT NULL DEFAULT 0,
            height_mm REAL NOT NULL DEFAULT 0,
            thickness_mm REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'NEW',
            products_using INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS raw_material (
            material_id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            unit TEXT NOT NULL,
            unit_cost TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
