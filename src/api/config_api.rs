// ==========================================
// 家具 BOM 成本核算 - 配置管理 API
// ==========================================
// 职责: 核算规则查询/更新、配置快照导出与恢复
// ==========================================

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager, CostingConfigReader};
use crate::engine::cost_calculator::CostingRules;

/// 核算规则设置页的全部参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostingSettings {
    pub rules: CostingRules,
    pub target_variance_pct: Decimal,
    pub packaging_rate_per_m2: Decimal,
    pub similarity_tolerance_pct: f64,
    pub similarity_debounce_ms: u64,
}

fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("配置读写失败: {}", err))
}

pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 读取当前核算设置（缺省项取默认值）
    pub async fn get_settings(&self) -> ApiResult<CostingSettings> {
        let cfg = &self.config_manager;
        Ok(CostingSettings {
            rules: cfg.get_costing_rules().await.map_err(config_error)?,
            target_variance_pct: cfg.get_target_variance_pct().await.map_err(config_error)?,
            packaging_rate_per_m2: cfg.get_packaging_rate_per_m2().await.map_err(config_error)?,
            similarity_tolerance_pct: cfg
                .get_similarity_tolerance_pct()
                .await
                .map_err(config_error)?,
            similarity_debounce_ms: cfg.get_similarity_debounce_ms().await.map_err(config_error)?,
        })
    }

    /// 保存核算设置
    ///
    /// # 错误
    /// - InvalidCost: 任一费率为负
    /// - ValidationFailure: 容差非有限数或为负
    pub fn update_settings(&self, settings: &CostingSettings, operator: &str) -> ApiResult<()> {
        settings.rules.validate()?;
        for (field, value) in [
            ("target_variance_pct", settings.target_variance_pct),
            ("packaging_rate_per_m2", settings.packaging_rate_per_m2),
        ] {
            if value < Decimal::ZERO {
                return Err(ApiError::InvalidCost {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        let tolerance = settings.similarity_tolerance_pct;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ApiError::ValidationFailure(format!("容差无效: {}", tolerance)));
        }

        let rules = &settings.rules;
        let entries = [
            (config_keys::OVERHEAD_RATE, rules.overhead_rate.to_string()),
            (config_keys::FACTORY_PROFIT_RATE, rules.factory_profit_rate.to_string()),
            (config_keys::SELLING_MARKUP, rules.selling_markup.to_string()),
            (config_keys::TARGET_VARIANCE_PCT, settings.target_variance_pct.to_string()),
            (config_keys::PACKAGING_RATE_PER_M2, settings.packaging_rate_per_m2.to_string()),
            (config_keys::SIMILARITY_TOLERANCE_PCT, tolerance.to_string()),
            (config_keys::SIMILARITY_DEBOUNCE_MS, settings.similarity_debounce_ms.to_string()),
        ];
        for (key, value) in entries {
            self.config_manager
                .set_config_value(key, &value)
                .map_err(config_error)?;
        }
        info!(operator, "核算设置已更新");
        Ok(())
    }

    /// 设置远程目录服务地址（空串表示使用本地目录）
    pub fn set_remote_endpoint(&self, endpoint: &str, timeout_secs: u64) -> ApiResult<()> {
        self.config_manager
            .set_config_value(config_keys::REMOTE_ENDPOINT, endpoint.trim())
            .map_err(config_error)?;
        self.config_manager
            .set_config_value(config_keys::REMOTE_TIMEOUT_SECS, &timeout_secs.to_string())
            .map_err(config_error)?;
        Ok(())
    }

    /// 导出配置快照（JSON）
    pub fn export_snapshot(&self) -> ApiResult<String> {
        self.config_manager.get_config_snapshot().map_err(config_error)
    }

    /// 从快照恢复配置
    ///
    /// # 返回
    /// - 恢复的配置项数量
    pub fn restore_snapshot(&self, snapshot_json: &str, operator: &str) -> ApiResult<usize> {
        let count = self
            .config_manager
            .restore_config_from_snapshot(snapshot_json)
            .map_err(config_error)?;
        info!(operator, count, "配置已从快照恢复");
        Ok(count)
    }
}
