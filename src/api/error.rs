// ==========================================
// 家具 BOM 成本核算 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将下层错误转换为操作员可读的错误消息
// 约束: 每个错误必须带显式原因；被拦截的组件行必须可按 id 定位
// ==========================================

use crate::catalog::GatewayError;
use crate::domain::profile::ProfileRuleError;
use crate::domain::types::InvalidComplexity;
use crate::engine::advisory::{AdvisoryError, LineId};
use crate::engine::cost_calculator::CostError;
use crate::engine::material_cost::MaterialCostError;
use crate::engine::similarity::SimilarityError;
use crate::importer::error::ImportError as FileImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 成本计算错误
    // ==========================================
    #[error("复杂度等级无效: {0}（须为 1..=5）")]
    InvalidComplexity(i64),

    #[error("成本输入无效 ({field}): {value}")]
    InvalidCost { field: String, value: String },

    #[error("产品不存在: {0}")]
    ProductNotFound(String),

    // ==========================================
    // 提交拦截
    // ==========================================
    /// 存在待确认的相似组件（硬性拦截）
    #[error("存在未处理的相似组件: {}", format_line_ids(.line_ids))]
    UnresolvedSimilarMatches { line_ids: Vec<LineId> },

    /// 外部目录服务不可达（操作员可重试）
    #[error("网络请求失败: {0}")]
    NetworkFailure(String),

    #[error("数据校验失败: {0}")]
    ValidationFailure(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问 / 导入错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

fn format_line_ids(ids: &[LineId]) -> String {
    ids.iter().map(LineId::to_string).collect::<Vec<_>>().join(", ")
}

impl ApiError {
    /// 是否可由操作员重试（仅网络失败）
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::NetworkFailure(_))
    }

    /// 被拦截的组件行（仅 UnresolvedSimilarMatches）
    pub fn blocking_lines(&self) -> &[LineId] {
        match self {
            ApiError::UnresolvedSimilarMatches { line_ids } => line_ids,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CorruptValue { column, message } => {
                ApiError::DatabaseError(format!("第 {} 列存储值无法解析: {}", column, message))
            }
        }
    }
}

impl From<InvalidComplexity> for ApiError {
    fn from(err: InvalidComplexity) -> Self {
        ApiError::InvalidComplexity(err.0)
    }
}

impl From<CostError> for ApiError {
    fn from(err: CostError) -> Self {
        match err {
            CostError::InvalidComplexity(e) => e.into(),
            CostError::InvalidCost { field, value } => ApiError::InvalidCost {
                field: field.to_string(),
                value,
            },
        }
    }
}

impl From<SimilarityError> for ApiError {
    fn from(err: SimilarityError) -> Self {
        ApiError::ValidationFailure(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ProductNotFound(code) => ApiError::ProductNotFound(code),
            GatewayError::Network(msg) => ApiError::NetworkFailure(msg),
            GatewayError::Rejected(msg) => ApiError::ValidationFailure(msg),
            GatewayError::Config(msg) => ApiError::InternalError(msg),
            e @ GatewayError::UnitCostNotFound { .. } => ApiError::ValidationFailure(e.to_string()),
            GatewayError::Cost(e) => e.into(),
            GatewayError::Similarity(e) => e.into(),
            GatewayError::Repository(e) => e.into(),
        }
    }
}

impl From<AdvisoryError> for ApiError {
    fn from(err: AdvisoryError) -> Self {
        match err {
            AdvisoryError::UnresolvedSimilarMatches(line_ids) => {
                ApiError::UnresolvedSimilarMatches { line_ids }
            }
            AdvisoryError::LineNotFound(id) => ApiError::NotFound(format!("组件行 {} 不存在", id)),
            AdvisoryError::InvalidTransition { line_id, from, action } => {
                ApiError::InvalidStateTransition {
                    from: format!("{}:{}", line_id, from),
                    to: action.to_string(),
                }
            }
            AdvisoryError::LockError(msg) => ApiError::InternalError(msg),
            other => ApiError::ValidationFailure(other.to_string()),
        }
    }
}

impl From<MaterialCostError> for ApiError {
    fn from(err: MaterialCostError) -> Self {
        if err.is_retryable() {
            ApiError::NetworkFailure(err.to_string())
        } else {
            ApiError::ValidationFailure(err.to_string())
        }
    }
}

impl From<ProfileRuleError> for ApiError {
    fn from(err: ProfileRuleError) -> Self {
        match err {
            ProfileRuleError::InvalidTransition { from, to } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            other => ApiError::BusinessRuleViolation(other.to_string()),
        }
    }
}

impl From<FileImportError> for ApiError {
    fn from(err: FileImportError) -> Self {
        ApiError::ImportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ProfileStatus;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Product".to_string(),
            id: "SICILY-001".to_string(),
        };
        match ApiError::from(repo_err) {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Product"));
                assert!(msg.contains("SICILY-001"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_only_network_failure_is_retryable() {
        let network: ApiError = GatewayError::Network("timeout".to_string()).into();
        assert!(network.is_retryable());

        let missing: ApiError = GatewayError::ProductNotFound("X-001".to_string()).into();
        assert!(matches!(missing, ApiError::ProductNotFound(_)));
        assert!(!missing.is_retryable());
    }

    #[test]
    fn test_gate_error_keeps_line_ids() {
        let err: ApiError = AdvisoryError::UnresolvedSimilarMatches(vec![LineId(2), LineId(5)]).into();
        assert_eq!(err.blocking_lines(), &[LineId(2), LineId(5)]);
        assert!(err.to_string().contains("L2, L5"));
    }

    #[test]
    fn test_cost_errors() {
        let err: ApiError = CostError::from(InvalidComplexity(6)).into();
        assert!(matches!(err, ApiError::InvalidComplexity(6)));

        let err: ApiError = ProfileRuleError::InvalidTransition {
            from: ProfileStatus::Produced,
            to: ProfileStatus::New,
        }
        .into();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }
}
