// ==========================================
// 家具 BOM 成本核算 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalog_repo;
pub mod cost_version_repo;
pub mod error;
pub mod material_repo;
pub mod product_repo;
pub mod profile_repo;
pub mod row_utils;

// 重导出核心仓储
pub use catalog_repo::CatalogComponentRepository;
pub use cost_version_repo::CostVersionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use material_repo::MaterialRepository;
pub use product_repo::{ProductRepository, StoredLine};
pub use profile_repo::ProfileRepository;
