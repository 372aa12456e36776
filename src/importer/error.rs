// ==========================================
// 家具 BOM 成本核算 - 导入模块错误类型
// ==========================================
// 行号按表格习惯计数（表头为第 1 行）
// 任一行出错则整张 BOM 不入草稿
// ==========================================

use thiserror::Error;

/// BOM 表格来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Excel,
}

impl std::fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetFormat::Csv => write!(f, "CSV"),
            SheetFormat::Excel => write!(f, "Excel"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("{format} 解析失败: {message}")]
    Parse { format: SheetFormat, message: String },

    /// 无工作表或只有表头
    #[error("{0} 文件没有 BOM 行")]
    EmptySheet(SheetFormat),

    #[error("缺少必需列: {0}")]
    MissingColumn(String),

    #[error("必填字段为空 (行 {row}, 字段 {field})")]
    MissingField { row: usize, field: String },

    #[error("未知材质分类 (行 {row}): {value}")]
    UnknownSubComponent { row: usize, value: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Parse {
            format: SheetFormat::Csv,
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        let message = match err.position() {
            Some(pos) => format!("第 {} 行: {}", pos.line(), err),
            None => err.to_string(),
        };
        ImportError::Parse {
            format: SheetFormat::Csv,
            message,
        }
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Parse {
            format: SheetFormat::Excel,
            message: err.to_string(),
        }
    }
}

impl ImportError {
    /// 出错行号（文件级错误返回 None）
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::MissingField { row, .. }
            | ImportError::UnknownSubComponent { row, .. }
            | ImportError::TypeConversionError { row, .. } => Some(*row),
            _ => None,
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_level_errors_have_no_row() {
        assert_eq!(ImportError::EmptySheet(SheetFormat::Excel).row(), None);
        assert_eq!(ImportError::UnsupportedFormat("txt".into()).row(), None);
        let err = ImportError::UnknownSubComponent {
            row: 4,
            value: "Bamboo".into(),
        };
        assert_eq!(err.row(), Some(4));
        assert!(err.to_string().contains("Bamboo"));
    }

    #[test]
    fn test_empty_sheet_names_format() {
        assert_eq!(
            ImportError::EmptySheet(SheetFormat::Csv).to_string(),
            "CSV 文件没有 BOM 行"
        );
    }
}
