// ==========================================
// 家具 BOM 成本核算 - 仓储层错误类型
// ==========================================
// 约束冲突按 SQLite 扩展错误码区分（唯一/外键）
// 存储值无法解析（金额、时间、枚举文本）单独归类
// ==========================================

use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    /// 产品编码 / 型材编号 / 组件编号重复
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    /// 引用的产品不存在（如远程目录下录入实际报价）
    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("存储值无法解析 (列 {column}): {message}")]
    CorruptValue { column: usize, message: String },
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let message = msg.unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(message)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        RepositoryError::ForeignKeyViolation(message)
                    }
                    _ => RepositoryError::DatabaseQueryError(message),
                }
            }
            rusqlite::Error::FromSqlConversionFailure(column, _, source) => {
                RepositoryError::CorruptValue {
                    column,
                    message: source.to_string(),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE product (code TEXT PRIMARY KEY);
             CREATE TABLE actual_cost (id TEXT PRIMARY KEY,
                 product_code TEXT NOT NULL REFERENCES product(code));",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: RepositoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_code_maps_to_unique() {
        let conn = conn();
        conn.execute("INSERT INTO product (code) VALUES (?1)", params!["SICILY-001"])
            .unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO product (code) VALUES (?1)", params!["SICILY-001"])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_missing_product_maps_to_foreign_key() {
        let conn = conn();
        let err: RepositoryError = conn
            .execute(
                "INSERT INTO actual_cost (id, product_code) VALUES ('r1', 'GHOST-001')",
                [],
            )
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}
