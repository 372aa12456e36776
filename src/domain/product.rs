// ==========================================
// 家具 BOM 成本核算 - 产品领域模型
// ==========================================

use crate::domain::component::ComponentLine;
use crate::domain::types::{ComplexityLevel, ProductStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// PackagingDims - 包装箱尺寸 (cm)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingDims {
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl PackagingDims {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self { length, width, height }
    }

    /// 箱体表面积 (m²) = 2(LW + LH + WH) / 10^4
    pub fn surface_area_m2(&self) -> f64 {
        let (l, w, h) = (self.length, self.width, self.height);
        2.0 * (l * w + l * h + w * h) / 10_000.0
    }

    pub fn is_empty(&self) -> bool {
        self.length <= 0.0 || self.width <= 0.0 || self.height <= 0.0
    }
}

// ==========================================
// ProductMetadata - 提交 BOM 时的产品信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetadata {
    pub name: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub main_material: String,
    #[serde(default)]
    pub packaging: PackagingDims,
    #[serde(default)]
    pub complexity: ComplexityLevel,
    /// 人工指定包装成本（为空则按箱体表面积计算）
    #[serde(default)]
    pub packaging_cost_override: Option<Decimal>,
}

impl ProductMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_type: String::new(),
            main_material: String::new(),
            packaging: PackagingDims::default(),
            complexity: ComplexityLevel::default(),
            packaging_cost_override: None,
        }
    }
}

// ==========================================
// Product - 产品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub code: String,                   // 生成的产品编码，如 SICILY-001
    pub name: String,
    pub product_type: String,
    pub main_material: String,
    pub packaging: PackagingDims,
    pub components: Vec<ComponentLine>, // 有序组件行
    pub complexity: ComplexityLevel,    // 当前复杂度
    pub current_version: u32,           // 当前成本版本号
    pub status: ProductStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// 产品列表行: 产品概要 + 当前成本版本的主要金额
///
/// 尚无成本版本的产品金额为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub code: String,
    pub name: String,
    pub product_type: String,
    pub main_material: String,
    pub complexity: ComplexityLevel,
    pub current_version: u32,
    pub status: ProductStatus,
    pub material_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// 产品编码前缀: 名称首个单词，大写，仅保留字母数字
///
/// "Sicily Dining Chair" → "SICILY"；名称无可用字符时为 "PRODUCT"
pub fn product_code_prefix(name: &str) -> String {
    let prefix: String = name
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if prefix.is_empty() {
        "PRODUCT".to_string()
    } else {
        prefix
    }
}

/// 产品编码 = 前缀-三位序号，如 SICILY-001
pub fn format_product_code(prefix: &str, seq: u32) -> String {
    format!("{}-{:03}", prefix, seq)
}

// ==========================================
// ActualCostRecord - 工厂实际报价
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualCostRecord {
    pub record_id: String,
    pub product_code: String,
    pub actual_cost: Decimal,
    pub estimated_cost: Decimal, // 录入时的当前版本出厂价
    pub entered_by: String,
    pub entered_at: DateTime<Utc>,
}

impl ActualCostRecord {
    /// 偏差百分比 = (实际 - 估算) / 估算 × 100
    pub fn variance_pct(&self) -> Option<Decimal> {
        if self.estimated_cost.is_zero() {
            return None;
        }
        Some((self.actual_cost - self.estimated_cost) / self.estimated_cost * Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_packaging_surface_area() {
        let dims = PackagingDims::new(100.0, 50.0, 20.0);
        // 2 * (5000 + 2000 + 1000) / 10000 = 1.6
        assert!((dims.surface_area_m2() - 1.6).abs() < 1e-12);
        assert!(!dims.is_empty());
        assert!(PackagingDims::default().is_empty());
    }

    #[test]
    fn test_product_code_prefix() {
        assert_eq!(product_code_prefix("Sicily Dining Chair"), "SICILY");
        assert_eq!(product_code_prefix("  teak-table 2 "), "TEAKTABLE");
        assert_eq!(product_code_prefix("  "), "PRODUCT");
        assert_eq!(format_product_code("SICILY", 1), "SICILY-001");
        assert_eq!(format_product_code("SICILY", 1234), "SICILY-1234");
    }

    #[test]
    fn test_variance_pct() {
        let record = ActualCostRecord {
            record_id: "R1".to_string(),
            product_code: "SICILY-001".to_string(),
            actual_cost: dec!(110),
            estimated_cost: dec!(100),
            entered_by: "ops".to_string(),
            entered_at: Utc::now(),
        };
        assert_eq!(record.variance_pct(), Some(dec!(10)));

        let zero = ActualCostRecord {
            estimated_cost: Decimal::ZERO,
            ..record
        };
        assert_eq!(zero.variance_pct(), None);
    }
}
