// ==========================================
// 家具 BOM 成本核算 - 成本领域模型
// ==========================================
// CostBreakdown: 一次成本计算的全部结果（精确小数，展示时再取 2 位）
// CostVersion: 不可变的成本快照，按产品追加，不删除不修改
// ==========================================

use crate::domain::types::ComplexityLevel;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 展示用小数位数
pub const PRESENTATION_DP: u32 = 2;

/// 金额展示取整（2 位，四舍五入远离 0）
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRESENTATION_DP, RoundingStrategy::MidpointAwayFromZero)
}

// ==========================================
// CostBreakdown - 成本分解
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub complexity: ComplexityLevel,
    pub material_cost: Decimal,  // 1. 材料
    pub labor_cost: Decimal,     // 2. 人工
    pub overhead: Decimal,       // 3. 管理费
    pub packaging_cost: Decimal, // 4. 包装
    pub subtotal: Decimal,       // 1+2+3+4
    pub factory_profit: Decimal, // 5. 工厂利润
    pub total_cost: Decimal,     // 出厂价
    pub selling_price: Decimal,  // 售价
    pub your_profit: Decimal,    // 售价 - 出厂价
}

impl CostBreakdown {
    /// 所有金额取 2 位小数（仅用于展示）
    pub fn rounded(&self) -> CostBreakdown {
        CostBreakdown {
            complexity: self.complexity,
            material_cost: round_money(self.material_cost),
            labor_cost: round_money(self.labor_cost),
            overhead: round_money(self.overhead),
            packaging_cost: round_money(self.packaging_cost),
            subtotal: round_money(self.subtotal),
            factory_profit: round_money(self.factory_profit),
            total_cost: round_money(self.total_cost),
            selling_price: round_money(self.selling_price),
            your_profit: round_money(self.your_profit),
        }
    }

    /// 某一项占出厂价的百分比
    pub fn share_of_total(&self, amount: Decimal) -> Decimal {
        if self.total_cost.is_zero() {
            return Decimal::ZERO;
        }
        amount / self.total_cost * Decimal::ONE_HUNDRED
    }
}

// ==========================================
// CostVersion - 成本版本
// ==========================================
// 每次调整复杂度重算都追加一个新版本，"当前" = 版本号最大者
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostVersion {
    pub product_code: String,
    pub version: u32,
    pub complexity: ComplexityLevel,
    pub material_cost: Decimal,
    pub labor_cost: Decimal,
    pub overhead: Decimal,
    pub packaging_cost: Decimal,
    pub factory_profit: Decimal,
    pub total_cost: Decimal,
    pub selling_price: Decimal,
    pub date: DateTime<Utc>,
    pub changed_by: String,
}

impl CostVersion {
    /// 从成本分解构造版本（版本号由仓储层在事务内分配）
    pub fn from_breakdown(
        product_code: impl Into<String>,
        breakdown: &CostBreakdown,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            version: 0,
            complexity: breakdown.complexity,
            material_cost: breakdown.material_cost,
            labor_cost: breakdown.labor_cost,
            overhead: breakdown.overhead,
            packaging_cost: breakdown.packaging_cost,
            factory_profit: breakdown.factory_profit,
            total_cost: breakdown.total_cost,
            selling_price: breakdown.selling_price,
            date: Utc::now(),
            changed_by: changed_by.into(),
        }
    }

    pub fn your_profit(&self) -> Decimal {
        self.selling_price - self.total_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(dec!(126.695704)), dec!(126.70));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(157.10267296)), dec!(157.10));
    }

    #[test]
    fn test_share_of_total_zero_total() {
        let breakdown = CostBreakdown {
            complexity: ComplexityLevel::Simple,
            material_cost: Decimal::ZERO,
            labor_cost: Decimal::ZERO,
            overhead: Decimal::ZERO,
            packaging_cost: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            factory_profit: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            your_profit: Decimal::ZERO,
        };
        assert_eq!(breakdown.share_of_total(dec!(10)), Decimal::ZERO);
    }
}
