// ==========================================
// 家具 BOM 成本核算 - 看板 API
// ==========================================
// 职责: 首页统计指标
//   - 产品总数 / 近 7 天核算数
//   - 实际报价与估算的平均绝对偏差
//   - 已量产型材数 / 标准化程度
// ==========================================

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::profile_api::standardisation_score;
use crate::domain::cost::round_money;
use crate::repository::{ProductRepository, ProfileRepository};

/// 看板统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: u64,
    pub products_last_7_days: u64,
    /// 平均绝对偏差（%），无实际报价时为空
    pub avg_abs_variance_pct: Option<Decimal>,
    pub produced_profiles: u64,
    pub total_profiles: u64,
    pub standardisation_score: u32,
}

pub struct DashboardApi {
    product_repo: Arc<ProductRepository>,
    profile_repo: Arc<ProfileRepository>,
}

impl DashboardApi {
    pub fn new(product_repo: Arc<ProductRepository>, profile_repo: Arc<ProfileRepository>) -> Self {
        Self {
            product_repo,
            profile_repo,
        }
    }

    /// 汇总看板指标
    pub fn get_stats(&self) -> ApiResult<DashboardStats> {
        let total_products = self.product_repo.count()?;
        let since = Utc::now() - Duration::days(7);
        let products_last_7_days = self.product_repo.count_created_since(since)?;

        let variances: Vec<Decimal> = self
            .product_repo
            .list_actual_costs(None)?
            .iter()
            .filter_map(|r| r.variance_pct())
            .map(|v| v.abs())
            .collect();
        let avg_abs_variance_pct = if variances.is_empty() {
            None
        } else {
            let sum: Decimal = variances.iter().sum();
            Some(round_money(sum / Decimal::from(variances.len())))
        };

        let (total_profiles, produced_profiles) = self.profile_repo.count_produced()?;

        Ok(DashboardStats {
            total_products,
            products_last_7_days,
            avg_abs_variance_pct,
            produced_profiles,
            total_profiles,
            standardisation_score: standardisation_score(produced_profiles, total_profiles),
        })
    }
}
