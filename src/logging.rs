// ==========================================
// 家具 BOM 成本核算 - 日志初始化
// ==========================================
// RUST_LOG 优先；未设置时本 crate info、依赖库 warn
// 命令行 --json-logs 切换为 JSON 行输出
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,bom_costing=info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 终端人读格式（带行号）
    #[default]
    Pretty,
    /// 每个事件一行 JSON，附带当前 span（如 submit_bom 的产品名）
    Json,
}

impl LogFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 安装全局 subscriber，进程内只应调用一次
///
/// ```no_run
/// use bom_costing::logging::{self, LogFormat};
/// logging::init(LogFormat::Pretty);
/// ```
pub fn init(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter());
    match format {
        LogFormat::Pretty => builder.with_target(true).with_line_number(true).init(),
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

/// 测试用：debug 级别写入测试捕获输出，重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("bom_costing=debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flag() {
        assert_eq!(LogFormat::from_flag(true), LogFormat::Json);
        assert_eq!(LogFormat::from_flag(false), LogFormat::default());
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::debug!(product = "MARINA-001", "logging ready");
    }
}
