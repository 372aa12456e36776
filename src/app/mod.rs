// ==========================================
// 家具 BOM 成本核算 - 应用层
// ==========================================
// 职责: 装配数据库、配置、目录服务与各 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DraftSession};
