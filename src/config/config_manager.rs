// ==========================================
// 家具 BOM 成本核算 - 核算设置存储
// ==========================================
// config_kv 表，仅使用 global scope
// 值以文本保存，读取时解析；无法解析的值回退到默认费率
// ==========================================

use crate::config::costing_config_trait::CostingConfigReader;
use crate::engine::cost_calculator::CostingRules;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 复用应用共享连接（会再次应用 PRAGMA，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        let manager = Self { conn };
        {
            let conn = manager.lock()?;
            crate::db::configure_sqlite_connection(&conn)?;
        }
        Ok(manager)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Box<dyn Error>> {
        self.conn
            .lock()
            .map_err(|e| format!("配置连接锁获取失败: {}", e).into())
    }

    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.lock()?.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "核算设置已更新");
        Ok(())
    }

    /// 读取并解析；格式错误时告警并使用默认值
    fn get_parsed_or_default<T: FromStr>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 非负费率；负数按格式错误处理
    fn get_rate_or_default(&self, key: &str, default: Decimal) -> Result<Decimal, Box<dyn Error>> {
        let value = self.get_parsed_or_default(key, default)?;
        if value < Decimal::ZERO {
            tracing::warn!(config_key = key, %value, "费率不能为负，使用默认值");
            return Ok(default);
        }
        Ok(value)
    }

    /// 导出全部核算设置（按键排序的 JSON 对象），用于在其他环境复现定价
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;
        Ok(serde_json::to_string(&settings)?)
    }

    /// 覆盖写回快照中的已知设置，返回写入条数
    ///
    /// 未知键（含 `__meta_` 注释键）跳过；整份快照在一个事务内生效
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let settings: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut restored = 0;
        for (key, value) in &settings {
            if !config_keys::ALL.contains(&key.as_str()) {
                tracing::debug!(config_key = %key, "快照中的未知设置，跳过");
                continue;
            }
            restored += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }
        tx.commit()?;
        tracing::info!(restored, "核算设置已从快照恢复");
        Ok(restored)
    }
}

// ==========================================
// CostingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl CostingConfigReader for ConfigManager {
    async fn get_costing_rules(&self) -> Result<CostingRules, Box<dyn Error>> {
        let defaults = CostingRules::default();
        Ok(CostingRules {
            overhead_rate: self.get_rate_or_default(config_keys::OVERHEAD_RATE, defaults.overhead_rate)?,
            factory_profit_rate: self
                .get_rate_or_default(config_keys::FACTORY_PROFIT_RATE, defaults.factory_profit_rate)?,
            selling_markup: self.get_rate_or_default(config_keys::SELLING_MARKUP, defaults.selling_markup)?,
        })
    }

    async fn get_target_variance_pct(&self) -> Result<Decimal, Box<dyn Error>> {
        self.get_rate_or_default(config_keys::TARGET_VARIANCE_PCT, Decimal::TEN)
    }

    async fn get_packaging_rate_per_m2(&self) -> Result<Decimal, Box<dyn Error>> {
        self.get_rate_or_default(config_keys::PACKAGING_RATE_PER_M2, Decimal::new(250, 2))
    }

    async fn get_similarity_tolerance_pct(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_parsed_or_default(config_keys::SIMILARITY_TOLERANCE_PCT, 10.0_f64)?;
        if !value.is_finite() || value < 0.0 {
            tracing::warn!(config_key = config_keys::SIMILARITY_TOLERANCE_PCT, value, "容差无效，使用默认值");
            return Ok(10.0);
        }
        Ok(value)
    }

    async fn get_similarity_debounce_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::SIMILARITY_DEBOUNCE_MS, 500)
    }

    async fn get_remote_endpoint(&self) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self
            .get_config_value(config_keys::REMOTE_ENDPOINT)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn get_remote_timeout_secs(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::REMOTE_TIMEOUT_SECS, 30)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 成本规则
    pub const OVERHEAD_RATE: &str = "overhead_rate";
    pub const FACTORY_PROFIT_RATE: &str = "factory_profit_rate";
    pub const SELLING_MARKUP: &str = "selling_markup";
    pub const TARGET_VARIANCE_PCT: &str = "target_variance_pct";
    pub const PACKAGING_RATE_PER_M2: &str = "packaging_rate_per_m2";

    // 查重
    pub const SIMILARITY_TOLERANCE_PCT: &str = "similarity_tolerance_pct";
    pub const SIMILARITY_DEBOUNCE_MS: &str = "similarity_debounce_ms";

    // 远程目录服务
    pub const REMOTE_ENDPOINT: &str = "remote_endpoint";
    pub const REMOTE_TIMEOUT_SECS: &str = "remote_timeout_secs";

    pub const ALL: [&str; 9] = [
        OVERHEAD_RATE,
        FACTORY_PROFIT_RATE,
        SELLING_MARKUP,
        TARGET_VARIANCE_PCT,
        PACKAGING_RATE_PER_M2,
        SIMILARITY_TOLERANCE_PCT,
        SIMILARITY_DEBOUNCE_MS,
        REMOTE_ENDPOINT,
        REMOTE_TIMEOUT_SECS,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let cfg = manager();
        assert_eq!(cfg.get_costing_rules().await.unwrap(), CostingRules::default());
        assert_eq!(cfg.get_similarity_tolerance_pct().await.unwrap(), 10.0);
        assert_eq!(cfg.get_similarity_debounce_ms().await.unwrap(), 500);
        assert_eq!(cfg.get_packaging_rate_per_m2().await.unwrap(), dec!(2.50));
        assert_eq!(cfg.get_remote_endpoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overrides_and_bad_values() {
        let cfg = manager();
        cfg.set_config_value(config_keys::OVERHEAD_RATE, "0.25").unwrap();
        cfg.set_config_value(config_keys::SELLING_MARKUP, "not-a-number").unwrap();
        cfg.set_config_value(config_keys::FACTORY_PROFIT_RATE, "-0.5").unwrap();

        let rules = cfg.get_costing_rules().await.unwrap();
        assert_eq!(rules.overhead_rate, dec!(0.25));
        assert_eq!(rules.selling_markup, dec!(0.24));
        assert_eq!(rules.factory_profit_rate, dec!(0.07));
    }

    #[test]
    fn test_snapshot_restore_skips_unknown_keys() {
        let cfg = manager();
        cfg.set_config_value(config_keys::OVERHEAD_RATE, "0.22").unwrap();
        let snapshot = cfg.get_config_snapshot().unwrap();
        assert!(snapshot.contains("overhead_rate"));

        let restored = cfg
            .restore_config_from_snapshot(r#"{"selling_markup":"0.30","__meta_note":"x","labor_rate":"9"}"#)
            .unwrap();
        assert_eq!(restored, 1);
        assert_eq!(cfg.get_config_value("__meta_note").unwrap(), None);
        assert_eq!(cfg.get_config_value("labor_rate").unwrap(), None);
        assert_eq!(
            cfg.get_config_value(config_keys::SELLING_MARKUP).unwrap().as_deref(),
            Some("0.30")
        );
    }
}
