// ==========================================
// ConfigApi 集成测试
// ==========================================
// 测试范围:
// 1. 默认核算设置
// 2. 设置更新与校验
// 3. 配置快照导出与恢复
// 4. 更新后的费率作用于成本计算
// 5. 更新后提交与重算使用新费率（与估算一致）
// ==========================================


use rust_decimal_macros::dec;

use bom_costing::api::ApiError;
use bom_costing::app::AppState;
use bom_costing::domain::{ComplexityLevel, ProductMetadata};
use bom_costing::engine::CostingRules;

use test_helpers::{create_test_db, open_shared, seed_materials, write_csv, TEAK_TABLE_CSV};

async fn setup() -> (AppState, tempfile::NamedTempFile) {
    let (temp_file, db_path) = create_test_db().expect("无法创建测试数据库");
    let state = AppState::new(db_path).await.expect("无法初始化AppState");
    (state, temp_file)
}

#[tokio::test]
async fn test_default_settings() {
    let (state, _db) = setup().await;
    let settings = state.config_api.get_settings().await.unwrap();

    assert_eq!(settings.rules, CostingRules::default());
    assert_eq!(settings.target_variance_pct, dec!(10));
    assert_eq!(settings.packaging_rate_per_m2, dec!(2.50));
    assert_eq!(settings.similarity_tolerance_pct, 10.0);
    assert_eq!(settings.similarity_debounce_ms, 500);
}

#[tokio::test]
async fn test_update_settings_affects_costing() {
    let (state, _db) = setup().await;
    let mut settings = state.config_api.get_settings().await.unwrap();
    settings.rules.overhead_rate = dec!(0.25);
    settings.similarity_tolerance_pct = 5.0;
    state.config_api.update_settings(&settings, "admin").unwrap();

    let reloaded = state.config_api.get_settings().await.unwrap();
    assert_eq!(reloaded.rules.overhead_rate, dec!(0.25));
    assert_eq!(reloaded.similarity_tolerance_pct, 5.0);

    // 100 材料，等级 1: labor 20, overhead (120)×0.25 = 30
    let breakdown = state.bom_api.compute_cost(100.0, 0.0, 1).await.unwrap();
    assert_eq!(breakdown.overhead, dec!(30));

    // 新草稿使用新容差
    let draft = state.bom_api.new_draft().await.unwrap();
    assert_eq!(draft.tolerance_pct(), 5.0);
}

#[tokio::test]
async fn test_update_settings_rejects_negative_values() {
    let (state, _db) = setup().await;
    let mut settings = state.config_api.get_settings().await.unwrap();
    settings.packaging_rate_per_m2 = dec!(-1);
    assert!(matches!(
        state.config_api.update_settings(&settings, "admin"),
        Err(ApiError::InvalidCost { .. })
    ));

    let mut settings = state.config_api.get_settings().await.unwrap();
    settings.similarity_tolerance_pct = f64::NAN;
    assert!(matches!(
        state.config_api.update_settings(&settings, "admin"),
        Err(ApiError::ValidationFailure(_))
    ));

    // 失败的更新不落库
    let current = state.config_api.get_settings().await.unwrap();
    assert_eq!(current.packaging_rate_per_m2, dec!(2.50));
}

#[tokio::test]
async fn test_snapshot_roundtrip() {
    let (state, _db) = setup().await;
    let mut settings = state.config_api.get_settings().await.unwrap();
    settings.rules.selling_markup = dec!(0.30);
    state.config_api.update_settings(&settings, "admin").unwrap();

    let snapshot = state.config_api.export_snapshot().unwrap();
    assert!(snapshot.contains("selling_markup"));

    settings.rules.selling_markup = dec!(0.50);
    state.config_api.update_settings(&settings, "admin").unwrap();

    let restored = state.config_api.restore_snapshot(&snapshot, "admin").unwrap();
    assert!(restored > 0);
    let current = state.config_api.get_settings().await.unwrap();
    assert_eq!(current.rules.selling_markup, dec!(0.30));
}

#[tokio::test]
async fn test_compute_cost_rejects_bad_input() {
    let (state, _db) = setup().await;
    assert!(matches!(
        state.bom_api.compute_cost(100.0, 0.0, 0).await,
        Err(ApiError::InvalidComplexity(0))
    ));
    assert!(matches!(
        state.bom_api.compute_cost(-5.0, 0.0, 3).await,
        Err(ApiError::InvalidCost { .. })
    ));
}

#[tokio::test]
async fn test_submit_after_update_matches_estimate() {
    let (state, _db) = setup().await;
    seed_materials(open_shared(&state.db_path).unwrap()).unwrap();

    let mut settings = state.config_api.get_settings().await.unwrap();
    settings.rules.overhead_rate = dec!(0.30);
    settings.rules.selling_markup = dec!(0.50);
    state.config_api.update_settings(&settings, "admin").unwrap();

    let csv = write_csv(TEAK_TABLE_CSV).unwrap();
    let session = state.new_draft_session().await.unwrap();
    state.import_api.import_into_draft(csv.path(), &session.draft).unwrap();

    let mut metadata = ProductMetadata::new("Marina Teak Table");
    metadata.complexity = ComplexityLevel::Simple;
    metadata.packaging_cost_override = Some(dec!(5));

    let estimate = state.bom_api.estimate_draft(&session.draft, &metadata).await.unwrap();
    let receipt = state
        .bom_api
        .submit_bom(&session.draft, &metadata, "tester")
        .await
        .unwrap();
    assert_eq!(receipt.total_cost, estimate.breakdown.total_cost);
    assert_eq!(receipt.selling_price, estimate.breakdown.selling_price);

    // 重算同样使用当前设置
    let v2 = state.bom_api.recalculate(&receipt.product_code, 1, "ops").await.unwrap();
    assert_eq!(v2.total_cost, receipt.total_cost);
}
