// ==========================================
// 家具 BOM 成本核算 - 目录/计价服务边界
// ==========================================
// 职责: 定义与外部目录服务交互的抽象接口
// 实现:
//   - LocalCatalog: 基于本地 SQLite 仓储（桌面/CLI 与测试使用）
//   - RemoteCatalog: 基于表格服务的 HTTP JSON 接口
// ==========================================

pub mod dto;
pub mod local;
pub mod remote;

use crate::domain::component::SimilarMatch;
use crate::domain::cost::CostVersion;
use crate::domain::types::{ComplexityLevel, SubComponent};
use crate::engine::cost_calculator::CostError;
use crate::engine::similarity::{SimilarityError, SimilarityQuery};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use thiserror::Error;

pub use dto::{BomReceipt, BomSubmission, SubmittedLine, UnitRate};
pub use local::LocalCatalog;
pub use remote::RemoteCatalog;

/// 目录服务错误
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("产品不存在: {0}")]
    ProductNotFound(String),

    #[error("未找到单价: sub_component={sub_component}, key={key}")]
    UnitCostNotFound { sub_component: SubComponent, key: String },

    #[error("网络请求失败: {0}")]
    Network(String),

    #[error("服务拒绝请求: {0}")]
    Rejected(String),

    #[error("核算设置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Cost(#[from] CostError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl GatewayError {
    /// 是否可由操作员重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Network(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// ==========================================
// CatalogGateway - 目录服务接口
// ==========================================
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// 解析单价
    ///
    /// # 参数
    /// - sub_component: 材质分类
    /// - key: 型材编号或原材料编号
    async fn resolve_unit_cost(&self, sub_component: SubComponent, key: &str)
        -> GatewayResult<UnitRate>;

    /// 查找相似组件（精确在前）
    async fn search_similar_components(
        &self,
        query: &SimilarityQuery,
    ) -> GatewayResult<Vec<SimilarMatch>>;

    /// 提交 BOM，返回产品编码与定价结果
    async fn submit_bom(&self, submission: &BomSubmission) -> GatewayResult<BomReceipt>;

    /// 以新复杂度重算，追加一个成本版本
    async fn recalculate_cost(
        &self,
        product_code: &str,
        level: ComplexityLevel,
        changed_by: &str,
    ) -> GatewayResult<CostVersion>;

    /// 成本版本历史（最新在前）
    async fn get_cost_versions(&self, product_code: &str) -> GatewayResult<Vec<CostVersion>>;
}
