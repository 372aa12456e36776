// ==========================================
// 家具 BOM 成本核算 - 配置层
// ==========================================
// 职责: 核算规则与查重参数的读取/覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod costing_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use costing_config_trait::CostingConfigReader;
