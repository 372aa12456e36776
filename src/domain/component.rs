// ==========================================
// 家具 BOM 成本核算 - 组件领域模型
// ==========================================
// ComponentLine: BOM 中的一行（编辑期草稿，提交后不可变）
// CatalogComponent: 已登记、可复用的组件（按 component_id 索引）
// ==========================================
// 外部数据可能缺字段: 数值字段统一为 Option<f64>,
// 缺失按 0 处理只发生在本文件的访问器里
// ==========================================

use crate::domain::types::SubComponent;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ComponentLine - BOM 组件行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLine {
    // ===== 归属 =====
    pub main_component: String,         // 分组标签，如 "LEGS"
    pub sub_component: SubComponent,    // 材质分类
    pub part_name: String,              // 零件名称
    #[serde(default)]
    pub profile: Option<String>,        // 型材编号（仅铝材有意义）

    // ===== 尺寸 (mm) =====
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    // ===== 派生量 =====
    #[serde(default)]
    pub m: Option<f64>,                 // 米
    #[serde(default)]
    pub m2: Option<f64>,                // 平方米
    #[serde(default)]
    pub m3: Option<f64>,                // 立方米
    #[serde(default)]
    pub density: Option<f64>,           // kg/m³
    #[serde(default)]
    pub weight: Option<f64>,            // 单件重量 kg
    #[serde(default)]
    pub total_weight: Option<f64>,      // 总重量 kg

    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub component_id: Option<String>,   // 引用的目录组件
}

fn default_quantity() -> u32 {
    1
}

/// 触发查重重置的字段快照
///
/// 两次编辑的签名不同 → 该行查重状态回到 Unchecked
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSignature {
    pub sub_component: SubComponent,
    pub profile: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub thickness: Option<f64>,
}

impl ComponentLine {
    /// 创建组件行（数量默认 1，尺寸为空）
    pub fn new(
        main_component: impl Into<String>,
        sub_component: SubComponent,
        part_name: impl Into<String>,
    ) -> Self {
        Self {
            main_component: main_component.into(),
            sub_component,
            part_name: part_name.into(),
            profile: None,
            length: None,
            width: None,
            thickness: None,
            quantity: 1,
            m: None,
            m2: None,
            m3: None,
            density: None,
            weight: None,
            total_weight: None,
            note: None,
            component_id: None,
        }
    }

    /// 设置尺寸 (mm)
    pub fn with_dimensions(mut self, length: f64, width: f64, thickness: Option<f64>) -> Self {
        self.length = Some(length);
        self.width = Some(width);
        self.thickness = thickness;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    // ===== 缺省为 0 的访问器 =====

    pub fn length_mm(&self) -> f64 {
        self.length.unwrap_or(0.0)
    }

    pub fn width_mm(&self) -> f64 {
        self.width.unwrap_or(0.0)
    }

    pub fn thickness_mm(&self) -> f64 {
        self.thickness.unwrap_or(0.0)
    }

    /// 是否填写了尺寸（长、宽均大于 0）
    pub fn has_dimensions(&self) -> bool {
        self.length_mm() > 0.0 && self.width_mm() > 0.0
    }

    /// 型材编号（去空白，空串视为无）
    pub fn profile_id(&self) -> Option<&str> {
        self.profile
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn dimension_signature(&self) -> DimensionSignature {
        DimensionSignature {
            sub_component: self.sub_component,
            profile: self.profile_id().map(str::to_string),
            length: self.length,
            width: self.width,
            thickness: self.thickness,
        }
    }

    /// 根据尺寸计算 m / m2 / m3 / 重量
    ///
    /// - m  = L / 1000
    /// - m2 = L·W / 10^6
    /// - m3 = L·W·T / 10^9
    /// - weight = m3 · density（无密度时保留原值）
    pub fn derive_measures(&mut self) {
        let l = self.length_mm();
        let w = self.width_mm();
        let t = self.thickness_mm();

        self.m = Some(l / 1_000.0);
        self.m2 = Some(l * w / 1_000_000.0);
        self.m3 = Some(l * w * t / 1_000_000_000.0);

        if let Some(density) = self.density {
            let weight = l * w * t / 1_000_000_000.0 * density;
            self.weight = Some(weight);
        }
        if let Some(weight) = self.weight {
            self.total_weight = Some(weight * self.quantity as f64);
        }
    }
}

// ==========================================
// CatalogComponent - 目录组件
// ==========================================
// 不做原地修改: "复用已有组件"只是让草稿行引用它
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogComponent {
    pub component_id: String,
    pub sub_component: SubComponent,
    pub part_name: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub thickness: Option<f64>,
    pub cost: Decimal,                  // 单件成本
    pub times_used: u32,                // 引用次数
    pub created_at: DateTime<Utc>,
}

impl CatalogComponent {
    pub fn length_mm(&self) -> f64 {
        self.length.unwrap_or(0.0)
    }

    pub fn width_mm(&self) -> f64 {
        self.width.unwrap_or(0.0)
    }

    pub fn thickness_mm(&self) -> f64 {
        self.thickness.unwrap_or(0.0)
    }
}

// ==========================================
// SimilarMatch - 查重命中
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarMatch {
    pub component_id: String,
    pub sub_component: SubComponent,
    pub length: f64,
    pub width: f64,
    pub thickness: f64,
    pub cost: Decimal,
    pub times_used: u32,
    pub is_exact: bool,
    /// 长、宽相对偏差之和（精确命中为 0）
    pub deviation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_defaults() {
        let line = ComponentLine::new("LEGS", SubComponent::Aluminum, "Front leg");
        assert_eq!(line.quantity, 1);
        assert_eq!(line.length_mm(), 0.0);
        assert!(!line.has_dimensions());
        assert_eq!(line.profile_id(), None);
    }

    #[test]
    fn test_derive_measures() {
        let mut line = ComponentLine::new("TOP", SubComponent::Teak, "Slat")
            .with_dimensions(1800.0, 90.0, Some(20.0))
            .with_quantity(10)
            .with_density(650.0);
        line.derive_measures();

        assert!((line.m.unwrap() - 1.8).abs() < 1e-12);
        assert!((line.m2.unwrap() - 0.162).abs() < 1e-12);
        assert!((line.m3.unwrap() - 0.00324).abs() < 1e-12);
        assert!((line.weight.unwrap() - 2.106).abs() < 1e-9);
        assert!((line.total_weight.unwrap() - 21.06).abs() < 1e-9);
    }

    #[test]
    fn test_signature_ignores_note_and_quantity() {
        let a = ComponentLine::new("LEGS", SubComponent::Aluminum, "Leg")
            .with_dimensions(600.0, 40.0, Some(2.0))
            .with_profile("ALU-PROFILE-40x20x1.7");
        let mut b = a.clone();
        b.note = Some("edge sanded".to_string());
        b.quantity = 4;
        assert_eq!(a.dimension_signature(), b.dimension_signature());

        b.width = Some(44.0);
        assert_ne!(a.dimension_signature(), b.dimension_signature());
    }

    #[test]
    fn test_deserialize_partial_line() {
        let json = r#"{"mainComponent":"LEGS","subComponent":"HARDWARE","partName":"Bolt"}"#;
        let line: ComponentLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.length, None);
        assert_eq!(line.width_mm(), 0.0);
    }
}
