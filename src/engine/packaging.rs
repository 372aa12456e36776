// ==========================================
// 家具 BOM 成本核算 - 包装成本
// ==========================================
// packaging_cost = 箱体表面积 (m²) × 每平方米单价
// 人工指定的包装成本优先
// ==========================================

use crate::domain::product::ProductMetadata;
use crate::engine::cost_calculator::{decimal_from_f64, CostError, CostResult};
use rust_decimal::Decimal;

/// 计算包装成本
///
/// # 参数
/// - metadata: 产品信息（含箱体尺寸与可选的人工指定值）
/// - rate_per_m2: 每平方米包装单价
///
/// # 返回
/// - 箱体尺寸不完整且无人工指定值时为 0
pub fn packaging_cost(metadata: &ProductMetadata, rate_per_m2: Decimal) -> CostResult<Decimal> {
    if let Some(manual) = metadata.packaging_cost_override {
        return Ok(manual);
    }
    if metadata.packaging.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let area = decimal_from_f64("packaging_area", metadata.packaging.surface_area_m2())?;
    area.checked_mul(rate_per_m2).ok_or_else(|| CostError::InvalidCost {
        field: "packaging_cost",
        value: format!("{} m² × {}", area, rate_per_m2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::PackagingDims;
    use rust_decimal_macros::dec;

    #[test]
    fn test_surface_area_pricing() {
        let mut meta = ProductMetadata::new("Sicily Chair");
        meta.packaging = PackagingDims::new(100.0, 50.0, 20.0);
        // 1.6 m² × 2.50
        assert_eq!(packaging_cost(&meta, dec!(2.50)).unwrap(), dec!(4.000));
    }

    #[test]
    fn test_override_wins() {
        let mut meta = ProductMetadata::new("Sicily Chair");
        meta.packaging = PackagingDims::new(100.0, 50.0, 20.0);
        meta.packaging_cost_override = Some(dec!(12.38));
        assert_eq!(packaging_cost(&meta, dec!(2.50)).unwrap(), dec!(12.38));
    }

    #[test]
    fn test_oversized_rate_is_rejected() {
        let mut meta = ProductMetadata::new("Sicily Chair");
        meta.packaging = PackagingDims::new(100.0, 50.0, 20.0);
        assert!(packaging_cost(&meta, Decimal::MAX).is_err());
    }

    #[test]
    fn test_missing_dims_is_zero() {
        let meta = ProductMetadata::new("Sicily Chair");
        assert_eq!(packaging_cost(&meta, dec!(2.50)).unwrap(), Decimal::ZERO);
    }
}
