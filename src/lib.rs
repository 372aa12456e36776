// ==========================================
// 家具 BOM 成本核算 - 核心库
// ==========================================
// 功能: 成本卷积计算、相似组件查重、成本版本历史
// 技术栈: Rust + SQLite（本地目录）/ HTTP JSON（远程目录）
// 金额: rust_decimal 精确计算，仅展示时保留两位小数
// ==========================================
// 分层: domain → engine → catalog/repository → api → app
// ==========================================

rust_i18n::i18n!("locales", fallback = "en");

pub mod domain;
pub mod engine;

/// 单价、查重、提交与版本的目录服务边界（本地 SQLite / 远程 HTTP）
pub mod catalog;
pub mod repository;

/// BOM 表格 (CSV / Excel) 导入
pub mod importer;
pub mod config;
pub mod db;
pub mod logging;
pub mod i18n;

pub mod api;
pub mod app;

pub use api::{ApiError, ApiResult, BomApi, ProfileApi};
pub use catalog::{CatalogGateway, LocalCatalog, RemoteCatalog};
pub use domain::types::{ComplexityLevel, ProductStatus, ProfileStatus, SubComponent};
pub use domain::{CatalogComponent, ComponentLine, CostBreakdown, CostVersion, Product, Profile};
pub use engine::{AdvisoryState, CostCalculator, DraftBom, LineId, SimilarityDebouncer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "家具 BOM 成本核算";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexported_defaults() {
        assert!(!VERSION.is_empty());
        assert_eq!(ComplexityLevel::default(), ComplexityLevel::Moderate);
    }
}
