// ==========================================
// 家具 BOM 成本核算 - 型材 / 原材料领域模型
// ==========================================
// Profile: 铝/钢挤压型材登记，受模具状态约束
// RawMaterial: 原材料库中的一条计价记录
// ==========================================

use crate::domain::types::{MaterialUnit, ProfileMaterial, ProfileStatus, ProfileType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 型材规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileRuleError {
    #[error("型材 {profile_id} 尚未确认模具，不能标记为 PRODUCED")]
    ToolingNotConfirmed { profile_id: String },

    #[error("无效的型材状态转换: from={from} to={to}")]
    InvalidTransition { from: ProfileStatus, to: ProfileStatus },

    #[error("型材 {profile_id} 仍被 {products_using} 个产品使用，不能删除")]
    InUse { profile_id: String, products_using: u32 },
}

// ==========================================
// Profile - 型材
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_id: String,
    pub material: ProfileMaterial,
    pub profile_type: ProfileType,
    pub width: f64,     // mm（圆管为外径）
    pub height: f64,    // mm
    pub thickness: f64, // 壁厚 mm
    pub status: ProfileStatus,
    pub products_using: u32,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// 新登记型材（状态 NEW，编号按规则生成）
    pub fn new(
        material: ProfileMaterial,
        profile_type: ProfileType,
        width: f64,
        height: f64,
        thickness: f64,
    ) -> Self {
        let profile_id = canonical_profile_id(material, profile_type, width, height, thickness);
        Self {
            profile_id,
            material,
            profile_type,
            width,
            height,
            thickness,
            status: ProfileStatus::New,
            products_using: 0,
            updated_at: Utc::now(),
        }
    }

    /// 状态转换
    ///
    /// - NEW ⇄ REVIEW 自由切换
    /// - → PRODUCED 必须确认模具已存在
    /// - PRODUCED 为终态
    pub fn transition_to(
        &mut self,
        target: ProfileStatus,
        tooling_confirmed: bool,
    ) -> Result<(), ProfileRuleError> {
        if self.status == target {
            return Ok(());
        }
        if self.status == ProfileStatus::Produced {
            return Err(ProfileRuleError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        if target == ProfileStatus::Produced && !tooling_confirmed {
            return Err(ProfileRuleError::ToolingNotConfirmed {
                profile_id: self.profile_id.clone(),
            });
        }

        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn can_delete(&self) -> bool {
        self.products_using == 0
    }

    pub fn ensure_deletable(&self) -> Result<(), ProfileRuleError> {
        if self.can_delete() {
            Ok(())
        } else {
            Err(ProfileRuleError::InUse {
                profile_id: self.profile_id.clone(),
                products_using: self.products_using,
            })
        }
    }

    /// 尺寸展示文本，如 "40×20×1.7" / "Ø60×1.5"
    pub fn dims_label(&self) -> String {
        match self.profile_type {
            ProfileType::Round => format!("Ø{}×{}", self.width, self.thickness),
            ProfileType::Plate => format!("{}", self.thickness),
            ProfileType::Flatbar => format!("{}×{}", self.width, self.thickness),
            _ => format!("{}×{}×{}", self.width, self.height, self.thickness),
        }
    }
}

/// 生成型材编号
///
/// - 矩形/方管: ALU-PROFILE-40x20x1.7
/// - 圆管: ALU-TUBE-Ø25x1.5
/// - 扁条: ALU-FLATBAR-30x3
/// - 板材: ALU-PLATE-3
pub fn canonical_profile_id(
    material: ProfileMaterial,
    profile_type: ProfileType,
    width: f64,
    height: f64,
    thickness: f64,
) -> String {
    let prefix = material.id_prefix();
    match profile_type {
        ProfileType::Rectangular | ProfileType::Square => {
            format!("{}-PROFILE-{}x{}x{}", prefix, width, height, thickness)
        }
        ProfileType::Round => format!("{}-TUBE-Ø{}x{}", prefix, width, thickness),
        ProfileType::Flatbar => format!("{}-FLATBAR-{}x{}", prefix, width, thickness),
        ProfileType::Plate => format!("{}-PLATE-{}", prefix, thickness),
    }
}

/// 从型材编号反解材质/截面/尺寸
///
/// 与 canonical_profile_id 互逆；不符合命名规则时返回 None
pub fn parse_profile_id(profile_id: &str) -> Option<Profile> {
    let mut parts = profile_id.trim().splitn(3, '-');
    let material = match parts.next()? {
        "ALU" => ProfileMaterial::Aluminum,
        "STEEL" => ProfileMaterial::Steel,
        _ => return None,
    };
    let kind = parts.next()?;
    let dims: Vec<f64> = parts
        .next()?
        .trim_start_matches('Ø')
        .split('x')
        .map(|d| d.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0))
        .collect::<Option<Vec<_>>>()?;

    let (profile_type, width, height, thickness) = match (kind, dims.as_slice()) {
        ("PROFILE", [w, h, t]) if w == h => (ProfileType::Square, *w, *h, *t),
        ("PROFILE", [w, h, t]) => (ProfileType::Rectangular, *w, *h, *t),
        ("TUBE", [d, t]) => (ProfileType::Round, *d, *d, *t),
        ("FLATBAR", [w, t]) => (ProfileType::Flatbar, *w, 0.0, *t),
        ("PLATE", [t]) => (ProfileType::Plate, 0.0, 0.0, *t),
        _ => return None,
    };
    Some(Profile::new(material, profile_type, width, height, thickness))
}

// ==========================================
// RawMaterial - 原材料
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    pub material_id: String, // 如 WOOD-TEAK-STD / ALU-PROFILE-40x20x1.7
    pub category: String,    // WOOD / ALUMINUM / FABRIC ...
    pub name: String,
    pub unit: MaterialUnit,
    pub unit_cost: Decimal,  // USD / unit
    pub active: bool,
}
