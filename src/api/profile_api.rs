// ==========================================
// 家具 BOM 成本核算 - 型材 API
// ==========================================
// 职责: 型材登记、状态流转、删除、标准化程度
// 状态: NEW ⇄ REVIEW → PRODUCED（需确认模具，终态）
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::profile::Profile;
use crate::domain::types::{ProfileMaterial, ProfileStatus, ProfileType};
use crate::engine::similarity::find_similar_profiles;
use crate::repository::ProfileRepository;

/// 型材库概况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRegistrySummary {
    pub total: u64,
    pub produced: u64,
    /// round(produced / total × 100)
    pub standardisation_score: u32,
}

/// 标准化程度 = round(已量产 / 总数 × 100)，空库为 0
pub fn standardisation_score(produced: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((produced as f64 / total as f64) * 100.0).round() as u32
}

// ==========================================
// ProfileApi
// ==========================================
pub struct ProfileApi {
    profile_repo: Arc<ProfileRepository>,
}

impl ProfileApi {
    pub fn new(profile_repo: Arc<ProfileRepository>) -> Self {
        Self { profile_repo }
    }

    /// 登记新型材（状态 NEW，编号按命名规则生成）
    ///
    /// # 错误
    /// - ValidationFailure: 尺寸非正数
    /// - BusinessRuleViolation: 编号已存在
    pub fn register(
        &self,
        material: ProfileMaterial,
        profile_type: ProfileType,
        width: f64,
        height: f64,
        thickness: f64,
    ) -> ApiResult<Profile> {
        if !(thickness.is_finite() && thickness > 0.0) {
            return Err(ApiError::ValidationFailure(format!("壁厚须为正数: {}", thickness)));
        }
        let needs_width = profile_type != ProfileType::Plate;
        if needs_width && !(width.is_finite() && width > 0.0) {
            return Err(ApiError::ValidationFailure(format!("宽度须为正数: {}", width)));
        }

        let profile = Profile::new(material, profile_type, width, height, thickness);
        self.profile_repo.insert(&profile)?;
        info!(profile_id = %profile.profile_id, "型材已登记");
        Ok(profile)
    }

    /// 查询型材（按使用产品数降序）
    pub fn list(&self, status: Option<ProfileStatus>) -> ApiResult<Vec<Profile>> {
        Ok(self.profile_repo.list(status)?)
    }

    fn load(&self, profile_id: &str) -> ApiResult<Profile> {
        self.profile_repo
            .find_by_id(profile_id)?
            .ok_or_else(|| ApiError::NotFound(format!("型材 {} 不存在", profile_id)))
    }

    fn transition(
        &self,
        profile_id: &str,
        target: ProfileStatus,
        tooling_confirmed: bool,
    ) -> ApiResult<Profile> {
        let mut profile = self.load(profile_id)?;
        let from = profile.status;
        profile.transition_to(target, tooling_confirmed)?;
        self.profile_repo.update_status(profile_id, target)?;
        info!(profile_id, %from, to = %target, "型材状态变更");
        Ok(profile)
    }

    /// 提交评审（NEW → REVIEW）
    pub fn submit_for_review(&self, profile_id: &str) -> ApiResult<Profile> {
        self.transition(profile_id, ProfileStatus::Review, false)
    }

    /// 退回（REVIEW → NEW）
    pub fn return_to_new(&self, profile_id: &str) -> ApiResult<Profile> {
        self.transition(profile_id, ProfileStatus::New, false)
    }

    /// 标记为已量产（必须确认模具已存在）
    pub fn mark_produced(&self, profile_id: &str, tooling_confirmed: bool) -> ApiResult<Profile> {
        self.transition(profile_id, ProfileStatus::Produced, tooling_confirmed)
    }

    /// 删除型材（仍被产品使用时拒绝）
    pub fn delete(&self, profile_id: &str) -> ApiResult<()> {
        let profile = self.load(profile_id)?;
        profile.ensure_deletable()?;

        // 读取与删除之间若被引用，由条件删除兜底
        if !self.profile_repo.delete_unused(profile_id)? {
            warn!(profile_id, "型材删除被拒绝: 已被引用");
            return Err(ApiError::BusinessRuleViolation(format!(
                "型材 {} 仍被产品使用，不能删除",
                profile_id
            )));
        }
        info!(profile_id, "型材已删除");
        Ok(())
    }

    /// 与指定型材相近的已量产型材
    pub fn similar_produced(&self, profile_id: &str, tolerance_pct: f64) -> ApiResult<Vec<Profile>> {
        let profile = self.load(profile_id)?;
        let registry = self.profile_repo.list(Some(ProfileStatus::Produced))?;
        Ok(find_similar_profiles(&profile, &registry, tolerance_pct)
            .into_iter()
            .cloned()
            .collect())
    }

    /// 型材库概况
    pub fn summary(&self) -> ApiResult<ProfileRegistrySummary> {
        let (total, produced) = self.profile_repo.count_produced()?;
        Ok(ProfileRegistrySummary {
            total,
            produced,
            standardisation_score: standardisation_score(produced, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardisation_score() {
        assert_eq!(standardisation_score(0, 0), 0);
        assert_eq!(standardisation_score(5, 6), 83);
        assert_eq!(standardisation_score(1, 8), 13);
        assert_eq!(standardisation_score(4, 4), 100);
    }
}
