// ==========================================
// 家具 BOM 成本核算 - 引擎层
// ==========================================
// 职责: 实现成本与查重业务规则,不拼 SQL
// 红线: Engine 不拼 SQL, 计算结果不做展示取整
// ==========================================

pub mod advisory;
pub mod cost_calculator;
pub mod debounce;
pub mod material_cost;
pub mod packaging;
pub mod similarity;

// 重导出核心引擎
pub use advisory::{
    AdvisoryError, AdvisoryResult, AdvisoryState, CheckOutcome, CheckTicket, DraftBom, DraftLine,
    LineId, SubmissionTicket,
};
pub use cost_calculator::{CostCalculator, CostError, CostResult, CostingRules};
pub use debounce::{SimilarityDebouncer, DEFAULT_DEBOUNCE_MS};
pub use material_cost::{
    resolve_material_cost, LineCost, MaterialCostError, MaterialCostSummary, PricingLine,
};
pub use packaging::packaging_cost;
pub use similarity::{
    find_similar, find_similar_profiles, SimilarityError, SimilarityQuery, DEFAULT_TOLERANCE_PCT,
};
