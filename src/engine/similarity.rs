// ==========================================
// 家具 BOM 成本核算 - 相似组件查重引擎
// ==========================================
// 职责: 给定新组件的材质与尺寸，在目录中查找精确/相近组件
// 适用: 仅刚性材质（铝材 + 木材）；软包与五金不查重
// ==========================================
// 精确命中: 材质相同，长/宽/厚完全相等（厚度缺失视为 0）
// 相近命中: 材质相同，长、宽各自满足 |候选 − 新| / 候选 ≤ 容差
//           厚度不参与相近判定
// 排序: 精确在前，其余按长宽相对偏差之和升序
// ==========================================

use crate::domain::component::{CatalogComponent, SimilarMatch};
use crate::domain::profile::Profile;
use crate::domain::types::{ProfileStatus, SubComponent};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{debug, instrument};

/// 默认容差（百分比）
pub const DEFAULT_TOLERANCE_PCT: f64 = 10.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("容差无效: {0}（须为非负有限数）")]
    InvalidTolerance(f64),
}

// ==========================================
// SimilarityQuery - 查重请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityQuery {
    pub sub_component: SubComponent,
    pub length: f64,
    pub width: f64,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default = "default_tolerance")]
    pub tolerance_pct: f64,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_PCT
}

impl SimilarityQuery {
    pub fn new(
        sub_component: SubComponent,
        length: f64,
        width: f64,
        thickness: Option<f64>,
        tolerance_pct: f64,
    ) -> Self {
        Self {
            sub_component,
            length,
            width,
            thickness,
            tolerance_pct,
        }
    }

    pub fn validate(&self) -> Result<(), SimilarityError> {
        if !self.tolerance_pct.is_finite() || self.tolerance_pct < 0.0 {
            return Err(SimilarityError::InvalidTolerance(self.tolerance_pct));
        }
        Ok(())
    }

    fn thickness_mm(&self) -> f64 {
        self.thickness.unwrap_or(0.0)
    }
}

/// |candidate − new| / candidate ≤ tolerance%
///
/// 以乘法比较避免边界值（如 4/40 = 10%）的浮点误差；
/// 候选尺寸为 0 时只接受同为 0
pub fn within_tolerance(candidate: f64, new: f64, tolerance_pct: f64) -> bool {
    if candidate == 0.0 {
        return new == 0.0;
    }
    (candidate - new).abs() * 100.0 <= tolerance_pct * candidate.abs()
}

fn relative_deviation(candidate: f64, new: f64) -> f64 {
    if candidate == 0.0 {
        return 0.0;
    }
    (candidate - new).abs() / candidate.abs()
}

/// 在候选目录中查找相似组件
///
/// # 返回
/// - 刚性材质: 命中列表（精确在前）
/// - 其他材质: 空列表
#[instrument(skip(candidates), fields(candidates = candidates.len()), level = "debug")]
pub fn find_similar(
    query: &SimilarityQuery,
    candidates: &[CatalogComponent],
) -> Result<Vec<SimilarMatch>, SimilarityError> {
    query.validate()?;

    if !query.sub_component.is_rigid() {
        debug!(sub_component = %query.sub_component, "非刚性材质，跳过查重");
        return Ok(Vec::new());
    }

    let mut matches: Vec<SimilarMatch> = candidates
        .iter()
        .filter(|c| c.sub_component == query.sub_component)
        .filter_map(|c| classify(query, c))
        .collect();

    matches.sort_by(compare_matches);
    Ok(matches)
}

fn classify(query: &SimilarityQuery, candidate: &CatalogComponent) -> Option<SimilarMatch> {
    let is_exact = candidate.length_mm() == query.length
        && candidate.width_mm() == query.width
        && candidate.thickness_mm() == query.thickness_mm();

    let is_similar = is_exact
        || (within_tolerance(candidate.length_mm(), query.length, query.tolerance_pct)
            && within_tolerance(candidate.width_mm(), query.width, query.tolerance_pct));

    if !is_similar {
        return None;
    }

    let deviation = if is_exact {
        0.0
    } else {
        relative_deviation(candidate.length_mm(), query.length)
            + relative_deviation(candidate.width_mm(), query.width)
    };

    Some(SimilarMatch {
        component_id: candidate.component_id.clone(),
        sub_component: candidate.sub_component,
        length: candidate.length_mm(),
        width: candidate.width_mm(),
        thickness: candidate.thickness_mm(),
        cost: candidate.cost,
        times_used: candidate.times_used,
        is_exact,
        deviation,
    })
}

/// 按本地规则重新判定外部目录返回的命中并排序
///
/// 外部服务的 is_exact / 顺序不作为依据
pub(crate) fn rank_matches(query: &SimilarityQuery, matches: Vec<SimilarMatch>) -> Vec<SimilarMatch> {
    let mut ranked: Vec<SimilarMatch> = matches
        .into_iter()
        .map(|mut m| {
            m.is_exact = m.length == query.length
                && m.width == query.width
                && m.thickness == query.thickness_mm();
            m.deviation = if m.is_exact {
                0.0
            } else {
                relative_deviation(m.length, query.length) + relative_deviation(m.width, query.width)
            };
            m
        })
        .collect();
    ranked.sort_by(compare_matches);
    ranked
}

pub(crate) fn compare_matches(a: &SimilarMatch, b: &SimilarMatch) -> Ordering {
    b.is_exact
        .cmp(&a.is_exact)
        .then_with(|| a.deviation.partial_cmp(&b.deviation).unwrap_or(Ordering::Equal))
        .then_with(|| b.times_used.cmp(&a.times_used))
        .then_with(|| a.component_id.cmp(&b.component_id))
}

// ==========================================
// 型材相似判定
// ==========================================

/// 查找与新型材相近的已量产型材
///
/// 同材质、同截面类型，宽/高在容差内；按使用产品数降序
pub fn find_similar_profiles<'a>(
    profile: &Profile,
    registry: &'a [Profile],
    tolerance_pct: f64,
) -> Vec<&'a Profile> {
    let mut similar: Vec<&Profile> = registry
        .iter()
        .filter(|p| p.profile_id != profile.profile_id)
        .filter(|p| p.status == ProfileStatus::Produced)
        .filter(|p| p.material == profile.material && p.profile_type == profile.profile_type)
        .filter(|p| {
            within_tolerance(p.width, profile.width, tolerance_pct)
                && within_tolerance(p.height, profile.height, tolerance_pct)
        })
        .collect();

    similar.sort_by(|a, b| b.products_using.cmp(&a.products_using));
    similar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ProfileMaterial, ProfileType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn catalog(id: &str, sub: SubComponent, l: f64, w: f64, t: Option<f64>, used: u32) -> CatalogComponent {
        CatalogComponent {
            component_id: id.to_string(),
            sub_component: sub,
            part_name: "part".to_string(),
            profile: None,
            length: Some(l),
            width: Some(w),
            thickness: t,
            cost: dec!(4.20),
            times_used: used,
            created_at: Utc::now(),
        }
    }

    fn query(l: f64, w: f64, t: Option<f64>) -> SimilarityQuery {
        SimilarityQuery::new(SubComponent::Aluminum, l, w, t, DEFAULT_TOLERANCE_PCT)
    }

    #[test]
    fn test_exact_match() {
        let candidates = vec![catalog("C1", SubComponent::Aluminum, 600.0, 40.0, Some(2.0), 3)];
        let matches = find_similar(&query(600.0, 40.0, Some(2.0)), &candidates).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_exact);
        assert_eq!(matches[0].deviation, 0.0);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let candidates = vec![catalog("C1", SubComponent::Aluminum, 600.0, 40.0, Some(2.0), 3)];

        // |40-44|/40 = 10%
        let matches = find_similar(&query(600.0, 44.0, Some(2.0)), &candidates).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(!matches[0].is_exact);

        // |40-45|/40 = 12.5%
        let matches = find_similar(&query(600.0, 45.0, Some(2.0)), &candidates).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_both_dimensions_must_pass() {
        let candidates = vec![catalog("C1", SubComponent::Teak, 1000.0, 80.0, Some(20.0), 1)];
        let q = SimilarityQuery::new(SubComponent::Teak, 1050.0, 100.0, Some(20.0), 10.0);
        assert!(find_similar(&q, &candidates).unwrap().is_empty());
    }

    #[test]
    fn test_thickness_ignored_for_similarity() {
        let candidates = vec![catalog("C1", SubComponent::Aluminum, 600.0, 40.0, Some(2.0), 1)];
        let matches = find_similar(&query(600.0, 40.0, Some(3.0)), &candidates).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(!matches[0].is_exact);
    }

    #[test]
    fn test_missing_thickness_matches_missing() {
        let candidates = vec![catalog("C1", SubComponent::Aluminum, 600.0, 40.0, None, 1)];
        let matches = find_similar(&query(600.0, 40.0, None), &candidates).unwrap();
        assert!(matches[0].is_exact);

        let matches = find_similar(&query(600.0, 40.0, Some(0.0)), &candidates).unwrap();
        assert!(matches[0].is_exact);
    }

    #[test]
    fn test_other_material_class_never_matches() {
        let candidates = vec![catalog("C1", SubComponent::Acacia, 600.0, 40.0, Some(2.0), 1)];
        assert!(find_similar(&query(600.0, 40.0, Some(2.0)), &candidates).unwrap().is_empty());
    }

    #[test]
    fn test_exempt_classes_return_nothing() {
        let candidates = vec![catalog("C1", SubComponent::Fabric, 600.0, 40.0, None, 1)];
        let q = SimilarityQuery::new(SubComponent::Fabric, 600.0, 40.0, None, 10.0);
        assert!(find_similar(&q, &candidates).unwrap().is_empty());
    }

    #[test]
    fn test_ordering_exact_first_then_deviation() {
        let candidates = vec![
            catalog("FAR", SubComponent::Aluminum, 640.0, 42.0, Some(2.0), 9),
            catalog("NEAR", SubComponent::Aluminum, 610.0, 40.0, Some(2.0), 1),
            catalog("EXACT", SubComponent::Aluminum, 600.0, 40.0, Some(2.0), 0),
        ];
        let ids: Vec<String> = find_similar(&query(600.0, 40.0, Some(2.0)), &candidates)
            .unwrap()
            .into_iter()
            .map(|m| m.component_id)
            .collect();
        assert_eq!(ids, vec!["EXACT", "NEAR", "FAR"]);
    }

    #[test]
    fn test_invalid_tolerance() {
        let q = SimilarityQuery::new(SubComponent::Aluminum, 1.0, 1.0, None, -5.0);
        assert_eq!(find_similar(&q, &[]), Err(SimilarityError::InvalidTolerance(-5.0)));
        let q = SimilarityQuery::new(SubComponent::Aluminum, 1.0, 1.0, None, f64::NAN);
        assert!(find_similar(&q, &[]).is_err());
    }

    #[test]
    fn test_similar_profiles() {
        let mut produced = Profile::new(ProfileMaterial::Aluminum, ProfileType::Rectangular, 50.0, 25.0, 1.5);
        produced.status = ProfileStatus::Produced;
        produced.products_using = 8;
        let mut other = Profile::new(ProfileMaterial::Aluminum, ProfileType::Rectangular, 40.0, 20.0, 1.7);
        other.status = ProfileStatus::Produced;
        let candidate = Profile::new(ProfileMaterial::Aluminum, ProfileType::Rectangular, 55.0, 27.0, 1.6);

        let registry = vec![produced.clone(), other];
        let similar = find_similar_profiles(&candidate, &registry, 10.0);
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].profile_id, produced.profile_id);
    }
}
