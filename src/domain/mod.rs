// ==========================================
// 家具 BOM 成本核算 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod component;
pub mod cost;
pub mod product;
pub mod profile;
pub mod types;

// 重导出核心类型
pub use component::{CatalogComponent, ComponentLine, DimensionSignature, SimilarMatch};
pub use cost::{round_money, CostBreakdown, CostVersion};
pub use product::{
    format_product_code, product_code_prefix, ActualCostRecord, PackagingDims, Product,
    ProductListing, ProductMetadata,
};
pub use profile::{
    canonical_profile_id, parse_profile_id, Profile, ProfileRuleError, RawMaterial,
};
pub use types::{
    ComplexityLevel, InvalidComplexity, MaterialUnit, ProductStatus, ProfileMaterial,
    ProfileStatus, ProfileType, SubComponent,
};
