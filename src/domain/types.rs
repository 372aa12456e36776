// ==========================================
// 家具 BOM 成本核算 - 领域类型定义
// ==========================================
// 材质分类 / 复杂度等级 / 型材状态等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与表格服务一致)
// ==========================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 组件材质分类 (Sub Component)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubComponent {
    Aluminum,
    Teak,
    Acacia,
    Eucalyptus,
    Kamerere,
    Fabric,
    Foam,
    CushionInsert,
    Hardware,
    Accessories,
    Rope,
    Textilene,
}

impl SubComponent {
    pub const ALL: [SubComponent; 12] = [
        SubComponent::Aluminum,
        SubComponent::Teak,
        SubComponent::Acacia,
        SubComponent::Eucalyptus,
        SubComponent::Kamerere,
        SubComponent::Fabric,
        SubComponent::Foam,
        SubComponent::CushionInsert,
        SubComponent::Hardware,
        SubComponent::Accessories,
        SubComponent::Rope,
        SubComponent::Textilene,
    ];

    /// 刚性材质（铝材 + 木材）
    ///
    /// 只有刚性材质参与相似组件查重；软包与五金的尺寸差异不影响成本
    pub fn is_rigid(&self) -> bool {
        matches!(
            self,
            SubComponent::Aluminum
                | SubComponent::Teak
                | SubComponent::Acacia
                | SubComponent::Eucalyptus
                | SubComponent::Kamerere
        )
    }

    /// 是否为木材
    pub fn is_wood(&self) -> bool {
        self.is_rigid() && *self != SubComponent::Aluminum
    }

    /// 是否必须填写长/宽/厚
    pub fn requires_dimensions(&self) -> bool {
        !matches!(self, SubComponent::Hardware | SubComponent::Accessories)
    }

    /// 数据库/表格字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            SubComponent::Aluminum => "ALUMINUM",
            SubComponent::Teak => "TEAK",
            SubComponent::Acacia => "ACACIA",
            SubComponent::Eucalyptus => "EUCALYPTUS",
            SubComponent::Kamerere => "KAMERERE",
            SubComponent::Fabric => "FABRIC",
            SubComponent::Foam => "FOAM",
            SubComponent::CushionInsert => "CUSHION_INSERT",
            SubComponent::Hardware => "HARDWARE",
            SubComponent::Accessories => "ACCESSORIES",
            SubComponent::Rope => "ROPE",
            SubComponent::Textilene => "TEXTILENE",
        }
    }

    /// 从字符串解析（大小写不敏感，空格/连字符视为下划线）
    ///
    /// 例如 "Cushion Insert" / "cushion-insert" / "CUSHION_INSERT"
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ALUMINUM" | "ALUMINIUM" => Some(SubComponent::Aluminum),
            "TEAK" => Some(SubComponent::Teak),
            "ACACIA" => Some(SubComponent::Acacia),
            "EUCALYPTUS" => Some(SubComponent::Eucalyptus),
            "KAMERERE" => Some(SubComponent::Kamerere),
            "FABRIC" => Some(SubComponent::Fabric),
            "FOAM" => Some(SubComponent::Foam),
            "CUSHION_INSERT" => Some(SubComponent::CushionInsert),
            "HARDWARE" => Some(SubComponent::Hardware),
            "ACCESSORIES" | "ACCESSORY" => Some(SubComponent::Accessories),
            "ROPE" => Some(SubComponent::Rope),
            "TEXTILENE" => Some(SubComponent::Textilene),
            _ => None,
        }
    }
}

impl fmt::Display for SubComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 复杂度等级 (Complexity Level)
// ==========================================
// 等级决定人工成本占材料成本的比例
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ComplexityLevel {
    Simple,      // 1 - 20%
    Basic,       // 2 - 35%
    Moderate,    // 3 - 50% (默认)
    Complex,     // 4 - 70%
    VeryComplex, // 5 - 100%
}

impl ComplexityLevel {
    pub const ALL: [ComplexityLevel; 5] = [
        ComplexityLevel::Simple,
        ComplexityLevel::Basic,
        ComplexityLevel::Moderate,
        ComplexityLevel::Complex,
        ComplexityLevel::VeryComplex,
    ];

    /// 等级数值 (1..=5)
    pub fn level(&self) -> u8 {
        match self {
            ComplexityLevel::Simple => 1,
            ComplexityLevel::Basic => 2,
            ComplexityLevel::Moderate => 3,
            ComplexityLevel::Complex => 4,
            ComplexityLevel::VeryComplex => 5,
        }
    }

    /// 人工成本占材料成本的比例
    pub fn labor_rate(&self) -> Decimal {
        match self {
            ComplexityLevel::Simple => dec!(0.20),
            ComplexityLevel::Basic => dec!(0.35),
            ComplexityLevel::Moderate => dec!(0.50),
            ComplexityLevel::Complex => dec!(0.70),
            ComplexityLevel::VeryComplex => dec!(1.00),
        }
    }

    /// 描述文本的 i18n key
    pub fn label_key(&self) -> &'static str {
        match self {
            ComplexityLevel::Simple => "complexity.simple",
            ComplexityLevel::Basic => "complexity.basic",
            ComplexityLevel::Moderate => "complexity.moderate",
            ComplexityLevel::Complex => "complexity.complex",
            ComplexityLevel::VeryComplex => "complexity.very_complex",
        }
    }
}

impl Default for ComplexityLevel {
    fn default() -> Self {
        ComplexityLevel::Moderate
    }
}

impl TryFrom<i64> for ComplexityLevel {
    type Error = InvalidComplexity;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ComplexityLevel::Simple),
            2 => Ok(ComplexityLevel::Basic),
            3 => Ok(ComplexityLevel::Moderate),
            4 => Ok(ComplexityLevel::Complex),
            5 => Ok(ComplexityLevel::VeryComplex),
            other => Err(InvalidComplexity(other)),
        }
    }
}

impl From<ComplexityLevel> for i64 {
    fn from(level: ComplexityLevel) -> Self {
        level.level() as i64
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// 复杂度等级越界（有效范围 1..=5）
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("复杂度等级无效: {0}（有效范围 1-5）")]
pub struct InvalidComplexity(pub i64);

// ==========================================
// 型材材质 (Profile Material)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileMaterial {
    Aluminum,
    Steel,
}

impl ProfileMaterial {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileMaterial::Aluminum => "ALUMINUM",
            ProfileMaterial::Steel => "STEEL",
        }
    }

    /// 型材编号前缀
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ProfileMaterial::Aluminum => "ALU",
            ProfileMaterial::Steel => "STEEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ALUMINUM" | "ALUMINIUM" | "ALU" => Some(ProfileMaterial::Aluminum),
            "STEEL" => Some(ProfileMaterial::Steel),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 型材截面类型 (Profile Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Rectangular,
    Square,
    Round,
    Flatbar,
    Plate,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Rectangular => "RECTANGULAR",
            ProfileType::Square => "SQUARE",
            ProfileType::Round => "ROUND",
            ProfileType::Flatbar => "FLATBAR",
            ProfileType::Plate => "PLATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RECTANGULAR" => Some(ProfileType::Rectangular),
            "SQUARE" => Some(ProfileType::Square),
            "ROUND" => Some(ProfileType::Round),
            "FLATBAR" | "FLAT_BAR" => Some(ProfileType::Flatbar),
            "PLATE" => Some(ProfileType::Plate),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 型材状态 (Profile Status)
// ==========================================
// 顺序: New < Review < Produced
// Produced 表示模具已存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileStatus {
    New,
    Review,
    Produced,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::New => "NEW",
            ProfileStatus::Review => "REVIEW",
            ProfileStatus::Produced => "PRODUCED",
        }
    }

    /// 从字符串解析状态（未知值按 NEW 处理）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "REVIEW" => ProfileStatus::Review,
            "PRODUCED" => ProfileStatus::Produced,
            _ => ProfileStatus::New,
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 原材料计价单位 (Material Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialUnit {
    M3,  // 立方米（木材）
    M2,  // 平方米（面料）
    M,   // 米（绳/线）
    Kg,  // 千克（铝型材）
    Pcs, // 件（五金/配件）
}

impl MaterialUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialUnit::M3 => "M3",
            MaterialUnit::M2 => "M2",
            MaterialUnit::M => "M",
            MaterialUnit::Kg => "KG",
            MaterialUnit::Pcs => "PCS",
        }
    }

    /// 解析单位（兼容 m³ / m² 写法）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "M3" | "M³" => Some(MaterialUnit::M3),
            "M2" | "M²" => Some(MaterialUnit::M2),
            "M" => Some(MaterialUnit::M),
            "KG" => Some(MaterialUnit::Kg),
            "PCS" | "PC" | "EA" => Some(MaterialUnit::Pcs),
            _ => None,
        }
    }
}

impl fmt::Display for MaterialUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 产品状态 (Product Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Costed, // 已核算
    Quoted, // 已录入工厂实际报价
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Costed => "COSTED",
            ProductStatus::Quoted => "QUOTED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "QUOTED" => ProductStatus::Quoted,
            _ => ProductStatus::Costed,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigid_classes() {
        let rigid: Vec<_> = SubComponent::ALL.iter().filter(|s| s.is_rigid()).collect();
        assert_eq!(rigid.len(), 5);
        assert!(SubComponent::Aluminum.is_rigid());
        assert!(SubComponent::Kamerere.is_rigid());
        assert!(!SubComponent::Fabric.is_rigid());
        assert!(!SubComponent::Hardware.is_rigid());
    }

    #[test]
    fn test_requires_dimensions() {
        assert!(!SubComponent::Hardware.requires_dimensions());
        assert!(!SubComponent::Accessories.requires_dimensions());
        assert!(SubComponent::Foam.requires_dimensions());
        assert!(SubComponent::Teak.requires_dimensions());
    }

    #[test]
    fn test_sub_component_parse() {
        assert_eq!(SubComponent::parse("Cushion Insert"), Some(SubComponent::CushionInsert));
        assert_eq!(SubComponent::parse("cushion-insert"), Some(SubComponent::CushionInsert));
        assert_eq!(SubComponent::parse(" aluminium "), Some(SubComponent::Aluminum));
        assert_eq!(SubComponent::parse("PLASTIC"), None);

        for sub in SubComponent::ALL {
            assert_eq!(SubComponent::parse(sub.as_str()), Some(sub));
        }
    }

    #[test]
    fn test_complexity_try_from() {
        assert_eq!(ComplexityLevel::try_from(1), Ok(ComplexityLevel::Simple));
        assert_eq!(ComplexityLevel::try_from(5), Ok(ComplexityLevel::VeryComplex));
        assert_eq!(ComplexityLevel::try_from(0), Err(InvalidComplexity(0)));
        assert_eq!(ComplexityLevel::try_from(6), Err(InvalidComplexity(6)));
        assert_eq!(ComplexityLevel::default(), ComplexityLevel::Moderate);
    }

    #[test]
    fn test_complexity_labor_rates_increase() {
        let rates: Vec<Decimal> = ComplexityLevel::ALL.iter().map(|l| l.labor_rate()).collect();
        assert_eq!(rates, vec![dec!(0.20), dec!(0.35), dec!(0.50), dec!(0.70), dec!(1.00)]);
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_complexity_serde_as_number() {
        let json = serde_json::to_string(&ComplexityLevel::Complex).unwrap();
        assert_eq!(json, "4");
        let level: ComplexityLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, ComplexityLevel::Basic);
        assert!(serde_json::from_str::<ComplexityLevel>("9").is_err());
    }

    #[test]
    fn test_profile_status_order() {
        assert!(ProfileStatus::New < ProfileStatus::Review);
        assert!(ProfileStatus::Review < ProfileStatus::Produced);
        assert_eq!(ProfileStatus::from_str("produced"), ProfileStatus::Produced);
        assert_eq!(ProfileStatus::from_str("???"), ProfileStatus::New);
    }

    #[test]
    fn test_material_unit_parse() {
        assert_eq!(MaterialUnit::parse("m³"), Some(MaterialUnit::M3));
        assert_eq!(MaterialUnit::parse("kg"), Some(MaterialUnit::Kg));
        assert_eq!(MaterialUnit::parse("box"), None);
    }
}
