// ==========================================
// 家具 BOM 成本核算 - BOM API
// ==========================================
// 职责: 成本预览、BOM 提交、复杂度重算、版本历史、实际报价录入
// 提交流程:
//   1. 校验产品信息与组件行（任何状态变更之前）
//   2. 对 Unchecked / CheckFailed 的行重新查重
//   3. 提交闸门（PendingReview 硬性拦截，不调用目录服务）
//   4. 解析单价 → 材料成本；包装成本
//   5. 调用目录服务提交
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::BomValidator;
use crate::catalog::{BomReceipt, BomSubmission, CatalogGateway, SubmittedLine};
use crate::config::CostingConfigReader;
use crate::domain::component::ComponentLine;
use crate::domain::cost::{CostBreakdown, CostVersion};
use crate::domain::product::{ActualCostRecord, ProductMetadata};
use crate::domain::types::{ComplexityLevel, ProductStatus};
use crate::engine::advisory::{AdvisoryError, AdvisoryState, DraftBom, LineId};
use crate::engine::cost_calculator::CostCalculator;
use crate::engine::debounce::run_check;
use crate::engine::material_cost::{resolve_material_cost, MaterialCostSummary, PricingLine};
use crate::engine::packaging::packaging_cost;
use crate::repository::ProductRepository;

/// 草稿成本估算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEstimate {
    pub material: MaterialCostSummary,
    pub packaging_cost: Decimal,
    pub breakdown: CostBreakdown,
}

fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("配置读取失败: {}", err))
}

fn lock_draft(draft: &Mutex<DraftBom>) -> ApiResult<MutexGuard<'_, DraftBom>> {
    draft
        .lock()
        .map_err(|e| AdvisoryError::LockError(e.to_string()).into())
}

// ==========================================
// BomApi
// ==========================================
pub struct BomApi {
    gateway: Arc<dyn CatalogGateway>,
    config: Arc<dyn CostingConfigReader>,
    product_repo: Arc<ProductRepository>,
}

impl BomApi {
    /// 创建新的BomApi实例
    ///
    /// # 参数
    /// - gateway: 目录服务（本地或远程）
    /// - config: 核算配置
    /// - product_repo: 本地产品仓储（实际报价记录）
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        config: Arc<dyn CostingConfigReader>,
        product_repo: Arc<ProductRepository>,
    ) -> Self {
        Self {
            gateway,
            config,
            product_repo,
        }
    }

    async fn calculator(&self) -> ApiResult<CostCalculator> {
        let rules = self.config.get_costing_rules().await.map_err(config_error)?;
        rules.validate()?;
        Ok(CostCalculator::with_rules(rules))
    }

    /// 创建空草稿（容差取自配置）
    pub async fn new_draft(&self) -> ApiResult<DraftBom> {
        let tolerance = self
            .config
            .get_similarity_tolerance_pct()
            .await
            .map_err(config_error)?;
        Ok(DraftBom::new(tolerance))
    }

    // ==========================================
    // 成本预览
    // ==========================================

    /// 计算成本分解（不落库）
    ///
    /// # 参数
    /// - material_cost / packaging_cost: 非负有限数
    /// - level: 复杂度等级 1..=5
    ///
    /// # 错误
    /// - InvalidComplexity / InvalidCost
    pub async fn compute_cost(
        &self,
        material_cost: f64,
        packaging_cost: f64,
        level: i64,
    ) -> ApiResult<CostBreakdown> {
        let calculator = self.calculator().await?;
        Ok(calculator.compute_checked(material_cost, packaging_cost, level)?)
    }

    /// 估算草稿的材料/包装/总成本（不提交）
    pub async fn estimate_draft(
        &self,
        draft: &Mutex<DraftBom>,
        metadata: &ProductMetadata,
    ) -> ApiResult<DraftEstimate> {
        let pricing: Vec<PricingLine> = lock_draft(draft)?
            .submission_lines()
            .into_iter()
            .map(|(_, line, catalog_cost)| PricingLine { line, catalog_cost })
            .collect();
        self.price(&pricing, metadata).await
    }

    async fn price(
        &self,
        pricing: &[PricingLine],
        metadata: &ProductMetadata,
    ) -> ApiResult<DraftEstimate> {
        let material = resolve_material_cost(self.gateway.as_ref(), pricing).await?;
        let rate = self
            .config
            .get_packaging_rate_per_m2()
            .await
            .map_err(config_error)?;
        let packaging = packaging_cost(metadata, rate)?;
        let breakdown = self
            .calculator()
            .await?
            .compute(material.total, packaging, metadata.complexity)?;
        Ok(DraftEstimate {
            material,
            packaging_cost: packaging,
            breakdown,
        })
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交 BOM
    ///
    /// # 参数
    /// - draft: 草稿（与防抖查重共享）
    /// - metadata: 产品信息
    /// - operator: 操作人
    ///
    /// # 错误
    /// - ValidationFailure: 缺少产品名称 / 无组件行 / 缺少尺寸
    /// - UnresolvedSimilarMatches: 存在待确认的相似组件（带行号）
    /// - NetworkFailure: 查重或单价解析时目录服务不可达（可重试）
    #[instrument(skip_all, fields(product = %metadata.name, operator = %operator))]
    pub async fn submit_bom(
        &self,
        draft: &Mutex<DraftBom>,
        metadata: &ProductMetadata,
        operator: &str,
    ) -> ApiResult<BomReceipt> {
        // 1. 校验
        {
            let guard = lock_draft(draft)?;
            let mut violations = BomValidator::check_metadata(metadata);
            violations.extend(BomValidator::check_lines(
                guard.iter().map(|(id, d)| (*id, &d.line)),
            ));
            BomValidator::into_result(violations)?;
        }

        // 2. 补做查重
        let to_check = lock_draft(draft)?.lines_needing_check();
        for line_id in to_check {
            run_check(draft, self.gateway.as_ref(), line_id).await?;
        }

        // 3. 闸门
        let (ticket, lines) = {
            let mut guard = lock_draft(draft)?;
            if let Err(err) = guard.submission_gate() {
                // 查重失败的行按网络失败返回，操作员可重试
                if let AdvisoryError::ChecksInFlight(_) = &err {
                    let failed = guard.iter().find_map(|(id, d)| match &d.state {
                        AdvisoryState::CheckFailed { reason } => Some((*id, reason.clone())),
                        _ => None,
                    });
                    if let Some((line_id, reason)) = failed {
                        return Err(ApiError::NetworkFailure(format!(
                            "组件行 {} 查重失败: {}",
                            line_id, reason
                        )));
                    }
                }
                return Err(err.into());
            }
            let ticket = guard.begin_submission()?;
            (ticket, guard.submission_lines())
        };

        // 4~5. 计价并提交；失败时释放在途提交
        let result = self.price_and_submit(&lines, metadata, operator).await;

        let mut guard = lock_draft(draft)?;
        match result {
            Ok(receipt) => {
                if !guard.finish_submission(ticket) {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "提交结果已过期: {}",
                        receipt.product_code
                    )));
                }
                info!(product_code = %receipt.product_code, warnings = receipt.warnings.len(), "BOM 提交成功");
                Ok(receipt)
            }
            Err(err) => {
                guard.abort_submission(ticket);
                warn!(error = %err, retryable = err.is_retryable(), "BOM 提交失败");
                Err(err)
            }
        }
    }

    async fn price_and_submit(
        &self,
        lines: &[(LineId, ComponentLine, Option<Decimal>)],
        metadata: &ProductMetadata,
        operator: &str,
    ) -> ApiResult<BomReceipt> {
        let pricing: Vec<PricingLine> = lines
            .iter()
            .map(|(_, line, catalog_cost)| PricingLine {
                line: line.clone(),
                catalog_cost: *catalog_cost,
            })
            .collect();
        let estimate = self.price(&pricing, metadata).await?;

        let submitted = pricing
            .into_iter()
            .zip(&estimate.material.lines)
            .map(|(pricing, cost)| SubmittedLine {
                line: pricing.line,
                unit_cost: cost.unit_cost,
            })
            .collect();

        let submission = BomSubmission {
            metadata: metadata.clone(),
            lines: submitted,
            material_cost: estimate.material.total,
            packaging_cost: estimate.packaging_cost,
            submitted_by: operator.to_string(),
        };
        Ok(self.gateway.submit_bom(&submission).await?)
    }

    // ==========================================
    // 重算与版本
    // ==========================================

    /// 以新复杂度重算（总是追加新版本）
    pub async fn recalculate(
        &self,
        product_code: &str,
        level: i64,
        changed_by: &str,
    ) -> ApiResult<CostVersion> {
        let level = ComplexityLevel::try_from(level)?;
        let version = self
            .gateway
            .recalculate_cost(product_code, level, changed_by)
            .await?;
        info!(product_code, version = version.version, "复杂度重算完成");
        Ok(version)
    }

    /// 成本版本历史（最新在前）
    pub async fn get_cost_versions(&self, product_code: &str) -> ApiResult<Vec<CostVersion>> {
        Ok(self.gateway.get_cost_versions(product_code).await?)
    }

    /// 录入工厂实际报价
    ///
    /// 估算值取当前最新版本的出厂价；偏差超出目标时告警
    pub async fn record_actual_cost(
        &self,
        product_code: &str,
        actual_cost: Decimal,
        entered_by: &str,
    ) -> ApiResult<ActualCostRecord> {
        if actual_cost < Decimal::ZERO {
            return Err(ApiError::InvalidCost {
                field: "actual_cost".to_string(),
                value: actual_cost.to_string(),
            });
        }

        let versions = self.gateway.get_cost_versions(product_code).await?;
        let latest = versions
            .first()
            .ok_or_else(|| ApiError::ProductNotFound(product_code.to_string()))?;

        let record = ActualCostRecord {
            record_id: Uuid::new_v4().to_string(),
            product_code: product_code.to_string(),
            actual_cost,
            estimated_cost: latest.total_cost,
            entered_by: entered_by.to_string(),
            entered_at: Utc::now(),
        };
        self.product_repo.insert_actual_cost(&record)?;
        self.product_repo
            .update_status(product_code, ProductStatus::Quoted)?;

        let target = self
            .config
            .get_target_variance_pct()
            .await
            .map_err(config_error)?;
        if let Some(variance) = record.variance_pct() {
            if variance.abs() > target {
                warn!(product_code, %variance, %target, "实际报价偏差超出目标");
            } else {
                info!(product_code, %variance, "实际报价已录入");
            }
        }
        Ok(record)
    }
}
