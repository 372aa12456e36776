// ==========================================
// 家具 BOM 成本核算 - 目录服务数据传输对象
// ==========================================
// 外部服务字段可能缺失: 数字缺失按 0，字符串缺失按空串
// 缺省处理只发生在本文件的 Wire* 类型上
// ==========================================

use crate::domain::component::{ComponentLine, SimilarMatch};
use crate::domain::cost::CostVersion;
use crate::domain::product::ProductMetadata;
use crate::domain::types::{ComplexityLevel, MaterialUnit, SubComponent};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 单位价格（价格 + 计价单位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRate {
    pub rate: Decimal,
    pub unit: MaterialUnit,
}

impl UnitRate {
    pub fn new(rate: Decimal, unit: MaterialUnit) -> Self {
        Self { rate, unit }
    }
}

/// 提交的组件行（ResolvedExisting 行带目录成本）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedLine {
    #[serde(flatten)]
    pub line: ComponentLine,
    /// 已解析的单件成本
    pub unit_cost: Decimal,
}

/// BOM 提交请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomSubmission {
    pub metadata: ProductMetadata,
    pub lines: Vec<SubmittedLine>,
    pub material_cost: Decimal,
    pub packaging_cost: Decimal,
    pub submitted_by: String,
}

/// BOM 提交结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomReceipt {
    pub product_code: String,
    pub material_cost: Decimal,
    pub total_cost: Decimal,
    pub selling_price: Decimal,
    #[serde(default)]
    pub warnings: Vec<String>,
}

// ==========================================
// Wire 类型（远程服务 JSON）
// ==========================================

fn decimal_or_zero(value: Option<f64>) -> Decimal {
    value
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireUnitCost {
    pub unit_cost: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireMatch {
    pub component_id: Option<String>,
    pub sub_component: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub thickness: Option<f64>,
    pub cost: Option<f64>,
    pub times_used: Option<u32>,
    pub is_exact: Option<bool>,
}

impl WireMatch {
    /// 材质缺失或无法识别时沿用查询的材质
    pub fn into_match(self, fallback: SubComponent) -> SimilarMatch {
        let sub_component = self
            .sub_component
            .as_deref()
            .and_then(SubComponent::parse)
            .unwrap_or(fallback);
        SimilarMatch {
            component_id: self.component_id.unwrap_or_default(),
            sub_component,
            length: self.length.unwrap_or(0.0),
            width: self.width.unwrap_or(0.0),
            thickness: self.thickness.unwrap_or(0.0),
            cost: decimal_or_zero(self.cost),
            times_used: self.times_used.unwrap_or(0),
            is_exact: self.is_exact.unwrap_or(false),
            deviation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireReceipt {
    pub product_code: Option<String>,
    pub material_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub selling_price: Option<f64>,
    pub warnings: Option<Vec<String>>,
}

impl From<WireReceipt> for BomReceipt {
    fn from(w: WireReceipt) -> Self {
        Self {
            product_code: w.product_code.unwrap_or_default(),
            material_cost: decimal_or_zero(w.material_cost),
            total_cost: decimal_or_zero(w.total_cost),
            selling_price: decimal_or_zero(w.selling_price),
            warnings: w.warnings.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCostVersion {
    pub product_code: Option<String>,
    pub version: Option<u32>,
    pub complexity: Option<i64>,
    pub material_cost: Option<f64>,
    pub labor_cost: Option<f64>,
    pub overhead: Option<f64>,
    pub packaging_cost: Option<f64>,
    pub factory_profit: Option<f64>,
    pub total_cost: Option<f64>,
    pub selling_price: Option<f64>,
    pub date: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
}

impl WireCostVersion {
    /// 复杂度缺失或越界时按默认等级处理
    pub fn into_version(self, product_code: &str) -> CostVersion {
        let complexity = self
            .complexity
            .and_then(|c| ComplexityLevel::try_from(c).ok())
            .unwrap_or_default();
        CostVersion {
            product_code: self
                .product_code
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| product_code.to_string()),
            version: self.version.unwrap_or(0),
            complexity,
            material_cost: decimal_or_zero(self.material_cost),
            labor_cost: decimal_or_zero(self.labor_cost),
            overhead: decimal_or_zero(self.overhead),
            packaging_cost: decimal_or_zero(self.packaging_cost),
            factory_profit: decimal_or_zero(self.factory_profit),
            total_cost: decimal_or_zero(self.total_cost),
            selling_price: decimal_or_zero(self.selling_price),
            date: self.date.unwrap_or_else(Utc::now),
            changed_by: self.changed_by.unwrap_or_default(),
        }
    }
}

/// 远程服务统一响应外壳
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    pub data: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_match_defaults_to_zero() {
        let wire: WireMatch = serde_json::from_str(r#"{"componentId":"C-7","length":600}"#).unwrap();
        let m = wire.into_match(SubComponent::Aluminum);
        assert_eq!(m.component_id, "C-7");
        assert_eq!(m.width, 0.0);
        assert_eq!(m.cost, Decimal::ZERO);
        assert_eq!(m.sub_component, SubComponent::Aluminum);
    }

    #[test]
    fn test_receipt_missing_fields() {
        let wire: WireReceipt =
            serde_json::from_str(r#"{"productCode":"SICILY-001","totalCost":126.7}"#).unwrap();
        let receipt = BomReceipt::from(wire);
        assert_eq!(receipt.product_code, "SICILY-001");
        assert_eq!(receipt.total_cost, dec!(126.7));
        assert_eq!(receipt.selling_price, Decimal::ZERO);
        assert!(receipt.warnings.is_empty());
    }

    #[test]
    fn test_cost_version_bad_complexity_falls_back() {
        let wire: WireCostVersion =
            serde_json::from_str(r#"{"version":4,"complexity":9,"totalCost":10}"#).unwrap();
        let v = wire.into_version("TABLE-002");
        assert_eq!(v.product_code, "TABLE-002");
        assert_eq!(v.version, 4);
        assert_eq!(v.complexity, ComplexityLevel::Moderate);
    }

    #[test]
    fn test_failure_envelope_decodes() {
        // 失败响应不带 data；载荷类型无需实现 Default
        let env: WireEnvelope<Vec<WireMatch>> =
            serde_json::from_str(r#"{"success":false,"error":"sheet locked"}"#).unwrap();
        assert_eq!(env.success, Some(false));
        assert_eq!(env.error.as_deref(), Some("sheet locked"));
        assert!(env.data.is_none());

        let env: WireEnvelope<WireReceipt> =
            serde_json::from_str(r#"{"success":true,"data":{"productCode":"SICILY-002"}}"#).unwrap();
        assert_eq!(env.data.map(|r| BomReceipt::from(r).product_code).as_deref(), Some("SICILY-002"));
    }
}
