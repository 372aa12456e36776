// ==========================================
// 家具 BOM 成本核算 - 本地目录服务
// ==========================================
// 基于本地 SQLite 仓储实现 CatalogGateway
// 提交流程:
//   1. 计算成本分解（版本 1）
//   2. 型材: 未登记的自动登记为 NEW，使用产品数 +1，生成提示
//   3. 目录组件: 复用的 times_used +1，新的刚性组件登记入目录
//   4. 写入产品与组件行（分配编码），追加成本版本
// ==========================================

use crate::catalog::dto::{BomReceipt, BomSubmission, UnitRate};
use crate::catalog::{CatalogGateway, GatewayError, GatewayResult};
use crate::config::CostingConfigReader;
use crate::domain::component::{CatalogComponent, SimilarMatch};
use crate::domain::cost::{CostBreakdown, CostVersion};
use crate::domain::product::{product_code_prefix, Product};
use crate::domain::profile::parse_profile_id;
use crate::domain::types::{ComplexityLevel, ProductStatus, ProfileStatus, SubComponent};
use crate::engine::cost_calculator::CostCalculator;
use crate::engine::similarity::{find_similar, find_similar_profiles, SimilarityQuery};
use crate::i18n::t_with_args;
use crate::repository::{
    CatalogComponentRepository, CostVersionRepository, MaterialRepository, ProductRepository,
    ProfileRepository, RepositoryError, StoredLine,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 本地目录服务
///
/// 成本规则与容差在每次调用时从配置读取，设置修改后立即生效
pub struct LocalCatalog {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn CostingConfigReader>,
    products: ProductRepository,
    versions: CostVersionRepository,
    components: CatalogComponentRepository,
    materials: MaterialRepository,
}

impl LocalCatalog {
    /// # 参数
    /// - conn: 共享数据库连接（需已建表）
    /// - config: 成本规则与查重容差来源
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn CostingConfigReader>) -> Self {
        Self {
            products: ProductRepository::new(conn.clone()),
            versions: CostVersionRepository::new(conn.clone()),
            components: CatalogComponentRepository::new(conn.clone()),
            materials: MaterialRepository::new(conn.clone()),
            conn,
            config,
        }
    }

    async fn calculator(&self) -> GatewayResult<CostCalculator> {
        let rules = self
            .config
            .get_costing_rules()
            .await
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(CostCalculator::with_rules(rules))
    }

    /// 新组件编号，如 CMP-3F9A12BC
    fn mint_component_id() -> String {
        let raw = Uuid::new_v4().simple().to_string();
        format!("CMP-{}", raw[..8].to_ascii_uppercase())
    }

    /// 处理提交中引用的型材，返回提示
    fn register_profiles(
        tx: &Connection,
        submission: &BomSubmission,
        tolerance_pct: f64,
    ) -> GatewayResult<Vec<String>> {
        let mut warnings = Vec::new();
        let profile_ids: BTreeSet<&str> = submission
            .lines
            .iter()
            .filter(|l| l.line.sub_component == SubComponent::Aluminum)
            .filter_map(|l| l.line.profile_id())
            .collect();

        let registry = ProfileRepository::list_in(tx, None)?;

        for profile_id in profile_ids {
            let profile = match ProfileRepository::find_by_id_in(tx, profile_id)? {
                Some(existing) => existing,
                None => match parse_profile_id(profile_id) {
                    Some(parsed) => {
                        ProfileRepository::insert_in(tx, &parsed)?;
                        info!(profile_id, "自动登记新型材");
                        parsed
                    }
                    None => {
                        warn!(profile_id, "型材编号不符合命名规则");
                        warnings.push(t_with_args(
                            "warning.unparsable_profile",
                            &[("profile", profile_id)],
                        ));
                        continue;
                    }
                },
            };

            ProfileRepository::increment_usage_in(tx, &profile.profile_id)?;

            if profile.status != ProfileStatus::Produced {
                warnings.push(t_with_args("warning.new_profile", &[("profile", profile_id)]));
                let similar: Vec<&str> = find_similar_profiles(&profile, &registry, tolerance_pct)
                    .into_iter()
                    .map(|p| p.profile_id.as_str())
                    .collect();
                if !similar.is_empty() {
                    warnings.push(t_with_args(
                        "warning.similar_profiles",
                        &[("profile", profile_id), ("similar", similar.join(", ").as_str())],
                    ));
                }
            }
        }
        Ok(warnings)
    }

    /// 型材计数、目录组件、产品与版本 1 在同一事务内写入
    ///
    /// 任一步失败整体回滚，操作员可直接重试
    fn persist_submission(
        &self,
        submission: &BomSubmission,
        breakdown: &CostBreakdown,
        tolerance_pct: f64,
    ) -> GatewayResult<(String, Vec<String>)> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let mut warnings = Self::register_profiles(&tx, submission, tolerance_pct)?;

        let mut stored = Vec::with_capacity(submission.lines.len());
        for submitted in &submission.lines {
            let mut line = submitted.line.clone();
            line.derive_measures();

            if line.sub_component.requires_dimensions() && !line.has_dimensions() {
                warnings.push(t_with_args("warning.missing_dimensions", &[("part", line.part_name.as_str())]));
            }

            if line.sub_component.is_rigid() {
                match line.component_id.as_deref() {
                    Some(component_id) => CatalogComponentRepository::increment_usage_in(&tx, component_id)?,
                    None => {
                        let component = CatalogComponent {
                            component_id: Self::mint_component_id(),
                            sub_component: line.sub_component,
                            part_name: line.part_name.clone(),
                            profile: line.profile_id().map(str::to_string),
                            length: line.length,
                            width: line.width,
                            thickness: line.thickness,
                            cost: submitted.unit_cost,
                            times_used: 1,
                            created_at: Utc::now(),
                        };
                        CatalogComponentRepository::insert_in(&tx, &component)?;
                        line.component_id = Some(component.component_id);
                    }
                }
            }

            stored.push(StoredLine {
                line,
                unit_cost: submitted.unit_cost,
            });
        }

        let metadata = &submission.metadata;
        let mut product = Product {
            code: String::new(),
            name: metadata.name.trim().to_string(),
            product_type: metadata.product_type.clone(),
            main_material: metadata.main_material.clone(),
            packaging: metadata.packaging,
            components: Vec::new(),
            complexity: metadata.complexity,
            current_version: 0,
            status: ProductStatus::Costed,
            created_by: submission.submitted_by.clone(),
            created_at: Utc::now(),
        };
        let code = ProductRepository::create_with_next_code_in(
            &tx,
            &mut product,
            &product_code_prefix(&metadata.name),
            &stored,
        )?;

        let mut version = CostVersion::from_breakdown(&code, breakdown, &submission.submitted_by);
        CostVersionRepository::append_next_version_in(&tx, &mut version)?;

        tx.commit().map_err(RepositoryError::from)?;
        Ok((code, warnings))
    }
}

#[async_trait]
impl CatalogGateway for LocalCatalog {
    async fn resolve_unit_cost(
        &self,
        sub_component: SubComponent,
        key: &str,
    ) -> GatewayResult<UnitRate> {
        match self.materials.find_by_id(key)? {
            Some(material) if material.active => Ok(UnitRate::new(material.unit_cost, material.unit)),
            _ => Err(GatewayError::UnitCostNotFound {
                sub_component,
                key: key.to_string(),
            }),
        }
    }

    async fn search_similar_components(
        &self,
        query: &SimilarityQuery,
    ) -> GatewayResult<Vec<SimilarMatch>> {
        if !query.sub_component.is_rigid() {
            return Ok(Vec::new());
        }
        let candidates = self.components.find_by_sub_component(query.sub_component)?;
        Ok(find_similar(query, &candidates)?)
    }

    #[instrument(skip_all, fields(product = %submission.metadata.name, lines = submission.lines.len()))]
    async fn submit_bom(&self, submission: &BomSubmission) -> GatewayResult<BomReceipt> {
        if submission.metadata.name.trim().is_empty() {
            return Err(GatewayError::Rejected("产品名称不能为空".to_string()));
        }
        if submission.lines.is_empty() {
            return Err(GatewayError::Rejected("BOM 至少需要一行组件".to_string()));
        }

        let breakdown = self.calculator().await?.compute(
            submission.material_cost,
            submission.packaging_cost,
            submission.metadata.complexity,
        )?;
        let tolerance_pct = self
            .config
            .get_similarity_tolerance_pct()
            .await
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let (code, warnings) = self.persist_submission(submission, &breakdown, tolerance_pct)?;

        info!(product_code = %code, total_cost = %breakdown.total_cost, "BOM 已提交");
        Ok(BomReceipt {
            product_code: code,
            material_cost: breakdown.material_cost,
            total_cost: breakdown.total_cost,
            selling_price: breakdown.selling_price,
            warnings,
        })
    }

    #[instrument(skip(self))]
    async fn recalculate_cost(
        &self,
        product_code: &str,
        level: ComplexityLevel,
        changed_by: &str,
    ) -> GatewayResult<CostVersion> {
        let latest = self
            .versions
            .find_latest(product_code)?
            .ok_or_else(|| GatewayError::ProductNotFound(product_code.to_string()))?;

        let breakdown = self
            .calculator()
            .await?
            .compute(latest.material_cost, latest.packaging_cost, level)?;
        let mut version = CostVersion::from_breakdown(product_code, &breakdown, changed_by);

        self.versions
            .append_next_version(&mut version)
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => GatewayError::ProductNotFound(product_code.to_string()),
                other => GatewayError::Repository(other),
            })?;

        info!(product_code, version = version.version, complexity = %level, "成本已重算");
        Ok(version)
    }

    async fn get_cost_versions(&self, product_code: &str) -> GatewayResult<Vec<CostVersion>> {
        if !self.products.exists(product_code)? {
            return Err(GatewayError::ProductNotFound(product_code.to_string()));
        }
        Ok(self.versions.list_by_product(product_code)?)
    }
}
