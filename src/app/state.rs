// ==========================================
// 家具 BOM 成本核算 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 目录服务: 配置了 remote_endpoint 时使用远程服务，否则使用本地 SQLite
// ==========================================

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{
    BomApi, ConfigApi, DashboardApi, ImportApi, MaterialApi, ProductApi, ProfileApi,
};
use crate::catalog::{CatalogGateway, LocalCatalog, RemoteCatalog};
use crate::config::{ConfigManager, CostingConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::advisory::DraftBom;
use crate::engine::debounce::SimilarityDebouncer;
use crate::repository::{MaterialRepository, ProductRepository, ProfileRepository};

/// 一次 BOM 录入会话：草稿 + 防抖查重
pub struct DraftSession {
    pub draft: Arc<Mutex<DraftBom>>,
    pub debouncer: SimilarityDebouncer,
}

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 当前目录服务（本地或远程）
    pub gateway: Arc<dyn CatalogGateway>,

    pub bom_api: Arc<BomApi>,
    pub product_api: Arc<ProductApi>,
    pub profile_api: Arc<ProfileApi>,
    pub material_api: Arc<MaterialApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub config_api: Arc<ConfigApi>,
    pub import_api: Arc<ImportApi>,

    config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时自动建表）
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config_reader: Arc<dyn CostingConfigReader> = config_manager.clone();
        let endpoint = config_manager
            .get_remote_endpoint()
            .await
            .map_err(|e| format!("读取远程地址失败: {}", e))?;

        // ==========================================
        // 仓储层
        // ==========================================
        let product_repo = Arc::new(ProductRepository::new(conn.clone()));
        let profile_repo = Arc::new(ProfileRepository::new(conn.clone()));
        let material_repo = Arc::new(MaterialRepository::new(conn.clone()));

        // ==========================================
        // 目录服务
        // ==========================================
        let gateway: Arc<dyn CatalogGateway> = match endpoint {
            Some(endpoint) => {
                let timeout = config_manager
                    .get_remote_timeout_secs()
                    .await
                    .map_err(|e| format!("读取远程超时失败: {}", e))?;
                tracing::info!(endpoint = %endpoint, timeout, "使用远程目录服务");
                Arc::new(RemoteCatalog::new(endpoint, timeout).map_err(|e| e.to_string())?)
            }
            None => Arc::new(LocalCatalog::new(conn.clone(), config_reader.clone())),
        };

        // ==========================================
        // API层
        // ==========================================
        let bom_api = Arc::new(BomApi::new(gateway.clone(), config_reader, product_repo.clone()));
        let product_api = Arc::new(ProductApi::new(product_repo.clone()));
        let profile_api = Arc::new(ProfileApi::new(profile_repo.clone()));
        let material_api = Arc::new(MaterialApi::new(material_repo));
        let dashboard_api = Arc::new(DashboardApi::new(product_repo, profile_repo));
        let config_api = Arc::new(ConfigApi::new(config_manager.clone()));
        let import_api = Arc::new(ImportApi::new());

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            gateway,
            bom_api,
            product_api,
            profile_api,
            material_api,
            dashboard_api,
            config_api,
            import_api,
            config_manager,
        })
    }

    /// 开启新的 BOM 录入会话（容差与防抖时长取自配置）
    pub async fn new_draft_session(&self) -> Result<DraftSession, String> {
        let draft = self.bom_api.new_draft().await.map_err(|e| e.to_string())?;
        let debounce_ms = self
            .config_manager
            .get_similarity_debounce_ms()
            .await
            .map_err(|e| format!("读取防抖时长失败: {}", e))?;

        let draft = Arc::new(Mutex::new(draft));
        let debouncer = SimilarityDebouncer::new(
            draft.clone(),
            self.gateway.clone(),
            Duration::from_millis(debounce_ms),
        );
        Ok(DraftSession { draft, debouncer })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 BOM_COSTING_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("BOM_COSTING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./bom_costing.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("bom-costing");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("bom_costing.db");
        }
    }
    path.to_string_lossy().to_string()
}
