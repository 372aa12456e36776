// ==========================================
// 家具 BOM 成本核算 - 成本计算引擎
// ==========================================
// 五步卷积: 材料 → 人工 → 管理费 → 包装 → 工厂利润 → 售价
// 红线: 纯函数，无副作用；全程精确小数，只在展示时取整
// ==========================================
// 1. labor    = material × labor_rate(level)
// 2. overhead = (material + labor) × overhead_rate
// 3. subtotal = material + labor + overhead + packaging
// 4. profit   = subtotal × factory_profit_rate
// 5. total    = subtotal + profit
// 6. selling  = total × (1 + selling_markup)
// 7. yours    = selling − total
// ==========================================

use crate::domain::cost::CostBreakdown;
use crate::domain::types::{ComplexityLevel, InvalidComplexity};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// 成本计算错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostError {
    #[error(transparent)]
    InvalidComplexity(#[from] InvalidComplexity),

    #[error("成本输入无效 ({field}): {value}")]
    InvalidCost { field: &'static str, value: String },
}

pub type CostResult<T> = Result<T, CostError>;

// ==========================================
// CostingRules - 成本规则
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostingRules {
    /// 管理费率（材料+人工的比例）
    pub overhead_rate: Decimal,
    /// 工厂利润率（小计的比例）
    pub factory_profit_rate: Decimal,
    /// 售价加成（出厂价的比例）
    pub selling_markup: Decimal,
}

impl Default for CostingRules {
    fn default() -> Self {
        Self {
            overhead_rate: dec!(0.20),
            factory_profit_rate: dec!(0.07),
            selling_markup: dec!(0.24),
        }
    }
}

impl CostingRules {
    /// 规则自检（费率不可为负）
    pub fn validate(&self) -> CostResult<()> {
        let fields = [
            ("overhead_rate", self.overhead_rate),
            ("factory_profit_rate", self.factory_profit_rate),
            ("selling_markup", self.selling_markup),
        ];
        for (field, value) in fields {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(CostError::InvalidCost {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ==========================================
// CostCalculator - 成本计算引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CostCalculator {
    rules: CostingRules,
}

impl CostCalculator {
    /// 使用默认规则（20% / 7% / 24%）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: CostingRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CostingRules {
        &self.rules
    }

    /// 计算成本分解
    ///
    /// # 参数
    /// - material_cost: 材料成本（已按组件汇总）
    /// - packaging_cost: 包装成本
    /// - level: 复杂度等级
    ///
    /// # 错误
    /// - InvalidCost: 任一成本为负
    #[instrument(skip(self), level = "debug")]
    pub fn compute(
        &self,
        material_cost: Decimal,
        packaging_cost: Decimal,
        level: ComplexityLevel,
    ) -> CostResult<CostBreakdown> {
        ensure_non_negative("material_cost", material_cost)?;
        ensure_non_negative("packaging_cost", packaging_cost)?;

        // 超出 Decimal 表示范围的输入按无效成本拒绝
        let overflow = || CostError::InvalidCost {
            field: "material_cost",
            value: format!("{} (超出可计算范围)", material_cost),
        };
        let labor_cost = material_cost.checked_mul(level.labor_rate()).ok_or_else(overflow)?;
        let overhead = material_cost
            .checked_add(labor_cost)
            .and_then(|base| base.checked_mul(self.rules.overhead_rate))
            .ok_or_else(overflow)?;
        let subtotal = material_cost
            .checked_add(labor_cost)
            .and_then(|v| v.checked_add(overhead))
            .and_then(|v| v.checked_add(packaging_cost))
            .ok_or_else(overflow)?;
        let factory_profit = subtotal
            .checked_mul(self.rules.factory_profit_rate)
            .ok_or_else(overflow)?;
        let total_cost = subtotal.checked_add(factory_profit).ok_or_else(overflow)?;
        let selling_price = Decimal::ONE
            .checked_add(self.rules.selling_markup)
            .and_then(|factor| total_cost.checked_mul(factor))
            .ok_or_else(overflow)?;
        let your_profit = selling_price - total_cost;

        Ok(CostBreakdown {
            complexity: level,
            material_cost,
            labor_cost,
            overhead,
            packaging_cost,
            subtotal,
            factory_profit,
            total_cost,
            selling_price,
            your_profit,
        })
    }

    /// 从未校验的原始输入计算（表格/前端传入的浮点数与整数等级）
    ///
    /// # 错误
    /// - InvalidComplexity: 等级不在 1..=5
    /// - InvalidCost: 成本为负、NaN 或无穷
    pub fn compute_checked(
        &self,
        material_cost: f64,
        packaging_cost: f64,
        level: i64,
    ) -> CostResult<CostBreakdown> {
        let level = ComplexityLevel::try_from(level)?;
        let material_cost = decimal_from_f64("material_cost", material_cost)?;
        let packaging_cost = decimal_from_f64("packaging_cost", packaging_cost)?;
        self.compute(material_cost, packaging_cost, level)
    }
}

/// f64 → Decimal（拒绝 NaN / 无穷 / 负数）
pub fn decimal_from_f64(field: &'static str, value: f64) -> CostResult<Decimal> {
    if !value.is_finite() {
        return Err(CostError::InvalidCost {
            field,
            value: value.to_string(),
        });
    }
    let decimal = Decimal::from_f64(value).ok_or_else(|| CostError::InvalidCost {
        field,
        value: value.to_string(),
    })?;
    ensure_non_negative(field, decimal)?;
    Ok(decimal)
}

fn ensure_non_negative(field: &'static str, value: Decimal) -> CostResult<()> {
    if value < Decimal::ZERO {
        return Err(CostError::InvalidCost {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sicily_table_level_1() {
        let calc = CostCalculator::new();
        let b = calc
            .compute(dec!(73.63), dec!(12.38), ComplexityLevel::Simple)
            .unwrap();

        assert_eq!(b.labor_cost, dec!(14.726));
        assert_eq!(b.overhead, dec!(17.6712));
        assert_eq!(b.subtotal, dec!(118.4072));
        assert_eq!(b.factory_profit, dec!(8.288504));
        assert_eq!(b.total_cost, dec!(126.695704));
        assert_eq!(b.selling_price, dec!(157.10267296));

        let r = b.rounded();
        assert_eq!(r.total_cost, dec!(126.70));
        assert_eq!(r.selling_price, dec!(157.10));
        assert_eq!(r.your_profit, dec!(30.41));
    }

    #[test]
    fn test_closed_form_all_levels() {
        let calc = CostCalculator::new();
        let material = dec!(52.40);
        let packaging = dec!(9.15);

        for level in ComplexityLevel::ALL {
            let b = calc.compute(material, packaging, level).unwrap();
            let labor = material * level.labor_rate();
            let expected_total =
                (material + labor + dec!(0.20) * (material + labor) + packaging) * dec!(1.07);
            assert_eq!(b.total_cost, expected_total, "level {}", level);
            assert_eq!(b.selling_price, expected_total * dec!(1.24));
            assert_eq!(b.your_profit, b.selling_price - b.total_cost);
        }
    }

    #[test]
    fn test_total_cost_monotonic_in_level() {
        let calc = CostCalculator::new();
        let totals: Vec<Decimal> = ComplexityLevel::ALL
            .iter()
            .map(|l| calc.compute(dec!(50.87), dec!(7.5), *l).unwrap().total_cost)
            .collect();
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_zero_material_cost() {
        let b = CostCalculator::new()
            .compute(Decimal::ZERO, dec!(10), ComplexityLevel::VeryComplex)
            .unwrap();
        assert_eq!(b.labor_cost, Decimal::ZERO);
        assert_eq!(b.total_cost, dec!(10.7));
    }

    #[test]
    fn test_invalid_complexity() {
        let calc = CostCalculator::new();
        assert_eq!(
            calc.compute_checked(10.0, 1.0, 0).unwrap_err(),
            CostError::InvalidComplexity(InvalidComplexity(0))
        );
        assert_eq!(
            calc.compute_checked(10.0, 1.0, 6).unwrap_err(),
            CostError::InvalidComplexity(InvalidComplexity(6))
        );
    }

    #[test]
    fn test_invalid_costs() {
        let calc = CostCalculator::new();
        assert!(matches!(
            calc.compute_checked(-1.0, 0.0, 3),
            Err(CostError::InvalidCost { field: "material_cost", .. })
        ));
        assert!(matches!(
            calc.compute_checked(1.0, f64::NAN, 3),
            Err(CostError::InvalidCost { field: "packaging_cost", .. })
        ));
        assert!(matches!(
            calc.compute_checked(f64::INFINITY, 0.0, 3),
            Err(CostError::InvalidCost { .. })
        ));
        assert!(matches!(
            calc.compute(dec!(-0.01), Decimal::ZERO, ComplexityLevel::Basic),
            Err(CostError::InvalidCost { .. })
        ));
    }

    #[test]
    fn test_compute_checked_matches_decimal_path() {
        let calc = CostCalculator::new();
        let b = calc.compute_checked(73.63, 12.38, 1).unwrap().rounded();
        assert_eq!(b.total_cost, dec!(126.70));
        assert_eq!(b.selling_price, dec!(157.10));
    }

    #[test]
    fn test_huge_finite_input_is_rejected() {
        let calc = CostCalculator::new();
        assert!(matches!(
            calc.compute_checked(5e28, 0.0, 5),
            Err(CostError::InvalidCost { .. })
        ));
        assert!(matches!(
            calc.compute(Decimal::MAX, Decimal::MAX, ComplexityLevel::Simple),
            Err(CostError::InvalidCost { .. })
        ));
    }

    #[test]
    fn test_custom_rules() {
        let rules = CostingRules {
            overhead_rate: dec!(0.25),
            factory_profit_rate: dec!(0.10),
            selling_markup: dec!(0.30),
        };
        assert!(rules.validate().is_ok());
        let b = CostCalculator::with_rules(rules)
            .compute(dec!(100), Decimal::ZERO, ComplexityLevel::Moderate)
            .unwrap();
        // labor 50, overhead 37.5, subtotal 187.5, profit 18.75, total 206.25
        assert_eq!(b.total_cost, dec!(206.25));
        assert_eq!(b.selling_price, dec!(268.125));
    }

    #[test]
    fn test_negative_rule_rejected() {
        let rules = CostingRules {
            overhead_rate: dec!(-0.1),
            ..CostingRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
