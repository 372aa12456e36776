// ==========================================
// 家具 BOM 成本核算 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行与前端调用
// ==========================================

pub mod bom_api;
pub mod config_api;
pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod material_api;
pub mod product_api;
pub mod profile_api;
pub mod validator;

// 重导出核心类型
pub use bom_api::{BomApi, DraftEstimate};
pub use config_api::{ConfigApi, CostingSettings};
pub use dashboard_api::{DashboardApi, DashboardStats};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse};
pub use material_api::MaterialApi;
pub use product_api::ProductApi;
pub use profile_api::{standardisation_score, ProfileApi, ProfileRegistrySummary};
pub use validator::{BomValidator, ValidationViolation};
