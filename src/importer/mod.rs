// ==========================================
// 家具 BOM 成本核算 - 导入模块
// ==========================================
// 职责: BOM 表格 (CSV / Excel) → 组件行草稿
// ==========================================

pub mod bom_importer;
pub mod error;
pub mod file_parser;

pub use bom_importer::{map_row, BomImporter};
pub use error::{ImportError, ImportResult, SheetFormat};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
