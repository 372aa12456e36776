// ==========================================
// 家具 BOM 成本核算 - 提交前校验器
// ==========================================
// 职责: 产品信息与组件行的必填/取值校验
// 说明: 校验在任何状态变更之前完成，违规项一次性全部返回
// ==========================================

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::component::ComponentLine;
use crate::domain::product::ProductMetadata;
use crate::domain::types::SubComponent;
use crate::engine::advisory::LineId;
use rust_decimal::Decimal;

// ==========================================
// ValidationViolation - 校验违规详情
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// 违规类型（MISSING_NAME / NO_LINES / MISSING_DIMENSIONS / ...）
    pub violation_type: String,
    /// 相关组件行（产品级违规为空）
    pub line_id: Option<LineId>,
    pub reason: String,
}

impl ValidationViolation {
    fn product(violation_type: &str, reason: impl Into<String>) -> Self {
        Self {
            violation_type: violation_type.to_string(),
            line_id: None,
            reason: reason.into(),
        }
    }

    fn line(violation_type: &str, line_id: LineId, reason: impl Into<String>) -> Self {
        Self {
            violation_type: violation_type.to_string(),
            line_id: Some(line_id),
            reason: reason.into(),
        }
    }
}

// ==========================================
// BomValidator
// ==========================================
pub struct BomValidator;

impl BomValidator {
    /// 校验产品信息
    pub fn check_metadata(metadata: &ProductMetadata) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();
        if metadata.name.trim().is_empty() {
            violations.push(ValidationViolation::product("MISSING_NAME", "产品名称不能为空"));
        }
        if let Some(manual) = metadata.packaging_cost_override {
            if manual < Decimal::ZERO {
                violations.push(ValidationViolation::product(
                    "INVALID_COST",
                    format!("包装成本不能为负: {}", manual),
                ));
            }
        }
        violations
    }

    /// 校验组件行
    ///
    /// # 规则
    /// - 至少一行
    /// - 非五金/配件行必须填写长、宽
    /// - 数量 ≥ 1
    /// - 铝材行必须填写型材编号
    pub fn check_lines<'a>(
        lines: impl IntoIterator<Item = (LineId, &'a ComponentLine)>,
    ) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();
        let mut count = 0;

        for (line_id, line) in lines {
            count += 1;
            if line.sub_component.requires_dimensions() && !line.has_dimensions() {
                violations.push(ValidationViolation::line(
                    "MISSING_DIMENSIONS",
                    line_id,
                    format!("{} ({}) 缺少长/宽", line.part_name, line.sub_component),
                ));
            }
            if line.quantity == 0 {
                violations.push(ValidationViolation::line(
                    "INVALID_QUANTITY",
                    line_id,
                    format!("{} 数量须 ≥ 1", line.part_name),
                ));
            }
            if line.sub_component == SubComponent::Aluminum && line.profile_id().is_none() {
                violations.push(ValidationViolation::line(
                    "MISSING_PROFILE",
                    line_id,
                    format!("{} 缺少型材编号", line.part_name),
                ));
            }
        }

        if count == 0 {
            violations.push(ValidationViolation::product("NO_LINES", "BOM 至少需要一行组件"));
        }
        violations
    }

    /// 汇总校验结果
    ///
    /// # 返回
    /// - Ok(()): 无违规
    /// - Err(ValidationFailure): 所有违规原因（带行号）
    pub fn into_result(violations: Vec<ValidationViolation>) -> ApiResult<()> {
        if violations.is_empty() {
            return Ok(());
        }
        let reasons: Vec<String> = violations
            .iter()
            .map(|v| match v.line_id {
                Some(id) => format!("[{}] {}", id, v.reason),
                None => v.reason.clone(),
            })
            .collect();
        Err(ApiError::ValidationFailure(reasons.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_name_and_no_lines() {
        let mut violations = BomValidator::check_metadata(&ProductMetadata::new("  "));
        violations.extend(BomValidator::check_lines(std::iter::empty()));

        let types: Vec<_> = violations.iter().map(|v| v.violation_type.as_str()).collect();
        assert_eq!(types, vec!["MISSING_NAME", "NO_LINES"]);
        assert!(matches!(
            BomValidator::into_result(violations),
            Err(ApiError::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_hardware_needs_no_dimensions() {
        let bolt = ComponentLine::new("HW", SubComponent::Hardware, "Bolt").with_quantity(8);
        let slat = ComponentLine::new("TOP", SubComponent::Teak, "Slat");

        let violations = BomValidator::check_lines([(LineId(1), &bolt), (LineId(2), &slat)]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line_id, Some(LineId(2)));
        assert_eq!(violations[0].violation_type, "MISSING_DIMENSIONS");
    }

    #[test]
    fn test_aluminum_requires_profile() {
        let rail = ComponentLine::new("FRAME", SubComponent::Aluminum, "Rail")
            .with_dimensions(600.0, 40.0, Some(2.0));
        let violations = BomValidator::check_lines([(LineId(3), &rail)]);
        assert_eq!(violations[0].violation_type, "MISSING_PROFILE");
        assert!(BomValidator::into_result(Vec::new()).is_ok());
    }
}
