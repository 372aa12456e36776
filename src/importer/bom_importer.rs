// ==========================================
// 家具 BOM 成本核算 - BOM 表格导入
// ==========================================
// 职责: 将 BOM 表格行映射为组件行（草稿）
// 规则:
//   - 表头大小写/空格不敏感，支持常见别名
//   - 数字缺失保持 None
//   - 未知材质或非数字尺寸报错并给出行号
// ==========================================

use crate::domain::component::ComponentLine;
use crate::domain::types::SubComponent;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{FileParser, RawRow, UniversalFileParser};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

// ===== 标准列 =====
const COL_MAIN: &str = "main_component";
const COL_SUB: &str = "sub_component";
const COL_PART: &str = "part_name";
const COL_PROFILE: &str = "profile";
const COL_LENGTH: &str = "length";
const COL_WIDTH: &str = "width";
const COL_THICKNESS: &str = "thickness";
const COL_QTY: &str = "quantity";
const COL_DENSITY: &str = "density";
const COL_NOTE: &str = "note";

/// 表头 → 标准列
fn canonical_column(header: &str) -> Option<&'static str> {
    let normalized: String = header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let column = match normalized.as_str() {
        "maincomponent" | "main" | "group" => COL_MAIN,
        "subcomponent" | "sub" | "material" => COL_SUB,
        "partname" | "part" | "name" => COL_PART,
        "profile" | "profileid" => COL_PROFILE,
        "length" | "lengthmm" | "l" => COL_LENGTH,
        "width" | "widthmm" | "w" => COL_WIDTH,
        "thickness" | "thicknessmm" | "t" => COL_THICKNESS,
        "qty" | "quantity" => COL_QTY,
        "density" => COL_DENSITY,
        "note" | "notes" | "remark" => COL_NOTE,
        _ => return None,
    };
    Some(column)
}

/// 按标准列重新索引一行
fn normalize(row: &RawRow) -> HashMap<&'static str, &str> {
    row.fields
        .iter()
        .filter_map(|(header, value)| canonical_column(header).map(|col| (col, value.as_str())))
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

fn parse_number(row: usize, field: &str, value: Option<&&str>) -> ImportResult<Option<f64>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let parsed: f64 = raw
        .replace(',', "")
        .parse()
        .map_err(|_| ImportError::TypeConversionError {
            row,
            field: field.to_string(),
            message: format!("非数字: {}", raw),
        })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(ImportError::TypeConversionError {
            row,
            field: field.to_string(),
            message: format!("须为非负数: {}", raw),
        });
    }
    Ok(Some(parsed))
}

/// 将一行映射为组件行
pub fn map_row(row: &RawRow) -> ImportResult<ComponentLine> {
    let n = row.row;
    let fields = normalize(row);

    let sub_raw = fields.get(COL_SUB).ok_or_else(|| ImportError::MissingField {
        row: n,
        field: COL_SUB.to_string(),
    })?;
    let sub_component = SubComponent::parse(sub_raw).ok_or_else(|| ImportError::UnknownSubComponent {
        row: n,
        value: sub_raw.to_string(),
    })?;
    let part_name = fields.get(COL_PART).ok_or_else(|| ImportError::MissingField {
        row: n,
        field: COL_PART.to_string(),
    })?;

    let mut line = ComponentLine::new(
        fields.get(COL_MAIN).copied().unwrap_or_default(),
        sub_component,
        *part_name,
    );
    line.profile = fields.get(COL_PROFILE).map(|p| p.to_string());
    line.length = parse_number(n, COL_LENGTH, fields.get(COL_LENGTH))?;
    line.width = parse_number(n, COL_WIDTH, fields.get(COL_WIDTH))?;
    line.thickness = parse_number(n, COL_THICKNESS, fields.get(COL_THICKNESS))?;
    line.density = parse_number(n, COL_DENSITY, fields.get(COL_DENSITY))?;
    line.note = fields.get(COL_NOTE).map(|v| v.to_string());

    if let Some(qty) = parse_number(n, COL_QTY, fields.get(COL_QTY))? {
        if qty.fract() != 0.0 || qty < 1.0 || qty > u32::MAX as f64 {
            return Err(ImportError::TypeConversionError {
                row: n,
                field: COL_QTY.to_string(),
                message: format!("数量须为正整数: {}", qty),
            });
        }
        line.quantity = qty as u32;
    }

    line.derive_measures();
    Ok(line)
}

// ==========================================
// BomImporter
// ==========================================
pub struct BomImporter<P: FileParser = UniversalFileParser> {
    parser: P,
}

impl BomImporter<UniversalFileParser> {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }
}

impl Default for BomImporter<UniversalFileParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: FileParser> BomImporter<P> {
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    /// 导入 BOM 文件
    ///
    /// # 返回
    /// - 按表格顺序排列的组件行；任一行出错则整体失败
    pub fn import_file(&self, path: &Path) -> ImportResult<Vec<ComponentLine>> {
        let rows = self.parser.parse_rows(path)?;
        if let Some(first) = rows.first() {
            let known: Vec<_> = first.fields.keys().filter_map(|h| canonical_column(h)).collect();
            for required in [COL_SUB, COL_PART] {
                if !known.contains(&required) {
                    return Err(ImportError::MissingColumn(required.to_string()));
                }
            }
        }

        let lines = rows.iter().map(map_row).collect::<ImportResult<Vec<_>>>()?;
        info!(file = %path.display(), lines = lines.len(), "BOM 表格导入完成");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn raw(row: usize, pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            row,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_map_row_with_aliases() {
        let line = map_row(&raw(
            2,
            &[
                ("Main Component", "FRAME"),
                ("Sub Component", "Aluminum"),
                ("Part Name", "Rail"),
                ("Profile", "ALU-PROFILE-40x20x1.7"),
                ("Length", "600"),
                ("Width", "40"),
                ("Thickness", ""),
                ("Qty", "4"),
            ],
        ))
        .unwrap();

        assert_eq!(line.sub_component, SubComponent::Aluminum);
        assert_eq!(line.quantity, 4);
        assert_eq!(line.length, Some(600.0));
        assert_eq!(line.thickness, None);
        assert_eq!(line.profile_id(), Some("ALU-PROFILE-40x20x1.7"));
    }

    #[test]
    fn test_unknown_sub_component_reports_row() {
        let err = map_row(&raw(7, &[("Sub Component", "Bamboo"), ("Part Name", "Slat")])).unwrap_err();
        assert_eq!(err.row(), Some(7));
        assert!(matches!(err, ImportError::UnknownSubComponent { .. }));
    }

    #[test]
    fn test_non_numeric_dimension_reports_row() {
        let err = map_row(&raw(
            3,
            &[("Sub Component", "Teak"), ("Part Name", "Top"), ("Width", "wide")],
        ))
        .unwrap_err();
        assert_eq!(err.row(), Some(3));
    }

    #[test]
    fn test_import_csv_skips_blank_rows() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Main Component,Sub Component,Part Name,Length,Width,Thickness,Quantity").unwrap();
        writeln!(file, "TOP,Teak,Slat,1200,90,20,6").unwrap();
        writeln!(file, ",,,,,,").unwrap();
        writeln!(file, "HW,Hardware,Bolt M6,,,,12").unwrap();

        let lines = BomImporter::new().import_file(file.path()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 6);
        assert!(lines[0].m3.is_some());
        assert_eq!(lines[1].sub_component, SubComponent::Hardware);
        assert_eq!(lines[1].length, None);
    }

    #[test]
    fn test_missing_required_column() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Part Name,Length").unwrap();
        writeln!(file, "Slat,1200").unwrap();

        assert!(matches!(
            BomImporter::new().import_file(file.path()),
            Err(ImportError::MissingColumn(_))
        ));
    }
}
