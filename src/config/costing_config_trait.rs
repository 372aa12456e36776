// ==========================================
// 家具 BOM 成本核算 - 成本配置读取 Trait
// ==========================================
// 职责: 定义核算/查重所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::engine::cost_calculator::CostingRules;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::error::Error;

// ==========================================
// CostingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait CostingConfigReader: Send + Sync {
    // ===== 成本规则 =====

    /// 获取成本规则（管理费率 / 工厂利润率 / 售价加成）
    ///
    /// # 默认值
    /// - 0.20 / 0.07 / 0.24
    async fn get_costing_rules(&self) -> Result<CostingRules, Box<dyn Error>>;

    /// 实际报价与估算的目标偏差（百分比）
    ///
    /// # 默认值
    /// - 10
    async fn get_target_variance_pct(&self) -> Result<Decimal, Box<dyn Error>>;

    /// 包装单价（每平方米箱体表面积）
    ///
    /// # 默认值
    /// - 2.50
    async fn get_packaging_rate_per_m2(&self) -> Result<Decimal, Box<dyn Error>>;

    // ===== 查重 =====

    /// 相似组件容差（百分比）
    ///
    /// # 默认值
    /// - 10
    async fn get_similarity_tolerance_pct(&self) -> Result<f64, Box<dyn Error>>;

    /// 查重防抖静默期（毫秒）
    ///
    /// # 默认值
    /// - 500
    async fn get_similarity_debounce_ms(&self) -> Result<u64, Box<dyn Error>>;

    // ===== 远程目录服务 =====

    /// 远程服务地址（未配置时使用本地目录）
    async fn get_remote_endpoint(&self) -> Result<Option<String>, Box<dyn Error>>;

    /// 远程请求超时（秒）
    ///
    /// # 默认值
    /// - 30
    async fn get_remote_timeout_secs(&self) -> Result<u64, Box<dyn Error>>;
}
