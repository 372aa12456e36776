// ==========================================
// 家具 BOM 成本核算 - 材料成本汇总
// ==========================================
// material_cost = Σ unit_cost(line) × quantity
// unit_cost:
//   - 复用已有组件的行: 目录成本
//   - 其他行: 单价 × 该行在计价单位下的用量
// 红线: 任一行解析失败即整体失败，不以 0 代替
// ==========================================

use crate::catalog::{CatalogGateway, GatewayError, UnitRate};
use crate::domain::component::ComponentLine;
use crate::domain::types::{MaterialUnit, SubComponent};
use futures::future::try_join_all;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum MaterialCostError {
    #[error("第 {index} 行 ({part_name}) 缺少型材编号")]
    MissingProfile { index: usize, part_name: String },

    #[error("第 {index} 行 ({part_name}) 缺少密度，无法按重量计价")]
    MissingDensity { index: usize, part_name: String },

    #[error("第 {index} 行 ({part_name}) 用量无效: {value}")]
    InvalidMeasure {
        index: usize,
        part_name: String,
        value: f64,
    },

    #[error("第 {index} 行 ({part_name}) 成本超出可计算范围")]
    Overflow { index: usize, part_name: String },

    #[error("第 {index} 行 ({part_name}) 单价解析失败: {source}")]
    Unresolved {
        index: usize,
        part_name: String,
        #[source]
        source: GatewayError,
    },
}

impl MaterialCostError {
    /// 出错行号（从 1 开始）
    pub fn line_index(&self) -> usize {
        match self {
            MaterialCostError::MissingProfile { index, .. }
            | MaterialCostError::MissingDensity { index, .. }
            | MaterialCostError::InvalidMeasure { index, .. }
            | MaterialCostError::Overflow { index, .. }
            | MaterialCostError::Unresolved { index, .. } => *index,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, MaterialCostError::Unresolved { source, .. } if source.is_retryable())
    }
}

/// 待计价的组件行
#[derive(Debug, Clone)]
pub struct PricingLine {
    pub line: ComponentLine,
    /// 复用目录组件时的目录成本
    pub catalog_cost: Option<Decimal>,
}

/// 单行计价结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCost {
    pub index: usize,
    pub unit_cost: Decimal,
    pub extended_cost: Decimal,
}

/// 材料成本汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCostSummary {
    pub lines: Vec<LineCost>,
    pub total: Decimal,
}

// ==========================================
// 计价键 / 用量
// ==========================================

/// 非铝材的默认原材料编号
pub fn default_material_key(sub_component: SubComponent) -> Option<&'static str> {
    match sub_component {
        SubComponent::Aluminum => None,
        SubComponent::Teak => Some("WOOD-TEAK-STD"),
        SubComponent::Acacia => Some("WOOD-ACACIA-STD"),
        SubComponent::Eucalyptus => Some("WOOD-EUCALYPTUS-STD"),
        SubComponent::Kamerere => Some("WOOD-KAMERERE-STD"),
        SubComponent::Fabric => Some("FABRIC-OUTDOOR-STD"),
        SubComponent::Foam => Some("FOAM-STD"),
        SubComponent::CushionInsert => Some("CUSHION-INSERT-STD"),
        SubComponent::Hardware => Some("HARDWARE-STD"),
        SubComponent::Accessories => Some("ACCESSORIES-STD"),
        SubComponent::Rope => Some("ROPE-STD"),
        SubComponent::Textilene => Some("TEXTILENE-STD"),
    }
}

/// 标称密度 (kg/m³)，行内未填写密度时使用
pub fn nominal_density(sub_component: SubComponent) -> Option<f64> {
    match sub_component {
        SubComponent::Aluminum => Some(2_700.0),
        SubComponent::Teak => Some(650.0),
        SubComponent::Acacia => Some(700.0),
        SubComponent::Eucalyptus => Some(800.0),
        SubComponent::Kamerere => Some(500.0),
        _ => None,
    }
}

/// 计价键: 铝材取型材编号，其他取行内编号或默认原材料编号
pub fn pricing_key(index: usize, line: &ComponentLine) -> Result<String, MaterialCostError> {
    if let Some(profile) = line.profile_id() {
        return Ok(profile.to_string());
    }
    default_material_key(line.sub_component)
        .map(str::to_string)
        .ok_or_else(|| MaterialCostError::MissingProfile {
            index,
            part_name: line.part_name.clone(),
        })
}

/// 单件在计价单位下的用量
///
/// - M3: L·W·T / 10^9
/// - M2: L·W / 10^6
/// - M:  L / 1000
/// - KG: m3 × 密度
/// - PCS: 1
pub fn measure_in_unit(
    index: usize,
    line: &ComponentLine,
    unit: MaterialUnit,
) -> Result<Decimal, MaterialCostError> {
    let (l, w, t) = (line.length_mm(), line.width_mm(), line.thickness_mm());
    let value = match unit {
        MaterialUnit::M3 => l * w * t / 1_000_000_000.0,
        MaterialUnit::M2 => l * w / 1_000_000.0,
        MaterialUnit::M => l / 1_000.0,
        MaterialUnit::Kg => {
            let density = line
                .density
                .or_else(|| nominal_density(line.sub_component))
                .ok_or_else(|| MaterialCostError::MissingDensity {
                    index,
                    part_name: line.part_name.clone(),
                })?;
            l * w * t / 1_000_000_000.0 * density
        }
        MaterialUnit::Pcs => 1.0,
    };

    if !value.is_finite() || value < 0.0 {
        return Err(MaterialCostError::InvalidMeasure {
            index,
            part_name: line.part_name.clone(),
            value,
        });
    }
    Decimal::from_f64(value).ok_or_else(|| MaterialCostError::InvalidMeasure {
        index,
        part_name: line.part_name.clone(),
        value,
    })
}

/// 单价 × 用量
pub fn unit_cost_from_rate(
    index: usize,
    line: &ComponentLine,
    rate: &UnitRate,
) -> Result<Decimal, MaterialCostError> {
    rate.rate
        .checked_mul(measure_in_unit(index, line, rate.unit)?)
        .ok_or_else(|| MaterialCostError::Overflow {
            index,
            part_name: line.part_name.clone(),
        })
}

// ==========================================
// 汇总
// ==========================================

/// 并发解析所有行的单价并汇总
///
/// # 返回
/// - Ok(summary): 各行成本与合计
/// - Err: 第一个失败的行（行号从 1 开始）
#[instrument(skip_all, fields(lines = lines.len()))]
pub async fn resolve_material_cost(
    gateway: &dyn CatalogGateway,
    lines: &[PricingLine],
) -> Result<MaterialCostSummary, MaterialCostError> {
    let futures = lines.iter().enumerate().map(|(i, pricing)| async move {
        let index = i + 1;
        let line = &pricing.line;

        let unit_cost = match pricing.catalog_cost {
            Some(cost) => cost,
            None => {
                let key = pricing_key(index, line)?;
                let rate = gateway
                    .resolve_unit_cost(line.sub_component, &key)
                    .await
                    .map_err(|source| MaterialCostError::Unresolved {
                        index,
                        part_name: line.part_name.clone(),
                        source,
                    })?;
                unit_cost_from_rate(index, line, &rate)?
            }
        };

        let extended_cost = unit_cost
            .checked_mul(Decimal::from(line.quantity))
            .ok_or_else(|| MaterialCostError::Overflow {
                index,
                part_name: line.part_name.clone(),
            })?;
        debug!(index, %unit_cost, %extended_cost, "行成本");
        Ok::<LineCost, MaterialCostError>(LineCost {
            index,
            unit_cost,
            extended_cost,
        })
    });

    let line_costs = try_join_all(futures).await?;
    let mut total = Decimal::ZERO;
    for (cost, pricing) in line_costs.iter().zip(lines) {
        total = total
            .checked_add(cost.extended_cost)
            .ok_or_else(|| MaterialCostError::Overflow {
                index: cost.index,
                part_name: pricing.line.part_name.clone(),
            })?;
    }
    Ok(MaterialCostSummary {
        lines: line_costs,
        total,
    })
}
