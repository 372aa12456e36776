// ==========================================
// 本地目录端到端测试
// ==========================================
// 测试范围:
// 1. 表格导入 → 提交 → 产品编码与首个成本版本
// 2. 复杂度重算追加版本（最新在前）
// 3. 第二次录入相同组件时命中查重并复用
// 4. 实际报价与看板指标
// ==========================================


use rust_decimal_macros::dec;

use bom_costing::api::ApiError;
use bom_costing::app::AppState;
use bom_costing::domain::{ComplexityLevel, ProductMetadata};
use bom_costing::engine::AdvisoryState;

use test_helpers::{create_test_db, open_shared, seed_materials, write_csv, TEAK_TABLE_CSV};

async fn setup() -> (AppState, tempfile::NamedTempFile) {
    let (temp_file, db_path) = create_test_db().expect("无法创建测试数据库");
    seed_materials(open_shared(&db_path).expect("无法打开数据库")).expect("写入单价失败");
    let state = AppState::new(db_path).await.expect("无法初始化AppState");
    (state, temp_file)
}

fn teak_table() -> ProductMetadata {
    let mut metadata = ProductMetadata::new("Marina Teak Table");
    metadata.complexity = ComplexityLevel::Simple;
    metadata.packaging_cost_override = Some(dec!(5));
    metadata
}

#[tokio::test]
async fn test_import_submit_and_first_version() {
    let (state, _db) = setup().await;
    let csv = write_csv(TEAK_TABLE_CSV).unwrap();

    let session = state.new_draft_session().await.unwrap();
    let imported = state
        .import_api
        .import_into_draft(csv.path(), &session.draft)
        .unwrap();
    assert_eq!(imported.imported, 2);

    let receipt = state
        .bom_api
        .submit_bom(&session.draft, &teak_table(), "tester")
        .await
        .expect("提交失败");

    assert_eq!(receipt.product_code, "MARINA-001");
    assert_eq!(receipt.material_cost, dec!(20.40));
    // labor 4.08, overhead 4.896, subtotal 34.376, profit 2.40632
    assert_eq!(receipt.total_cost, dec!(36.78232));
    assert_eq!(receipt.selling_price, dec!(36.78232) * dec!(1.24));

    let versions = state.bom_api.get_cost_versions("MARINA-001").await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[0].total_cost, receipt.total_cost);
    assert_eq!(versions[0].changed_by, "tester");
}

#[tokio::test]
async fn test_recalculation_appends_versions() {
    let (state, _db) = setup().await;
    let csv = write_csv(TEAK_TABLE_CSV).unwrap();
    let session = state.new_draft_session().await.unwrap();
    state
        .import_api
        .import_into_draft(csv.path(), &session.draft)
        .unwrap();
    let receipt = state
        .bom_api
        .submit_bom(&session.draft, &teak_table(), "tester")
        .await
        .unwrap();
    let code = receipt.product_code;

    // 两次相同等级的重算都会各自追加一个版本
    let v2 = state.bom_api.recalculate(&code, 3, "ops").await.unwrap();
    let v3 = state.bom_api.recalculate(&code, 3, "ops").await.unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(v3.version, 3);
    assert_eq!(v2.total_cost, v3.total_cost);
    assert_eq!(v3.complexity, ComplexityLevel::Moderate);
    assert_eq!(v3.material_cost, dec!(20.40));

    let versions = state.bom_api.get_cost_versions(&code).await.unwrap();
    let numbers: Vec<u32> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    // 非法等级与不存在的产品
    assert!(matches!(
        state.bom_api.recalculate(&code, 6, "ops").await,
        Err(ApiError::InvalidComplexity(6))
    ));
    assert!(matches!(
        state.bom_api.recalculate("GHOST-001", 2, "ops").await,
        Err(ApiError::ProductNotFound(_))
    ));
    assert_eq!(state.bom_api.get_cost_versions(&code).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_second_entry_hits_existing_component() {
    let (state, _db) = setup().await;
    let csv = write_csv(TEAK_TABLE_CSV).unwrap();

    let first = state.new_draft_session().await.unwrap();
    state
        .import_api
        .import_into_draft(csv.path(), &first.draft)
        .unwrap();
    state
        .bom_api
        .submit_bom(&first.draft, &teak_table(), "tester")
        .await
        .unwrap();

    // 相同尺寸的柚木板条已进入目录
    let second = state.new_draft_session().await.unwrap();
    let imported = state
        .import_api
        .import_into_draft(csv.path(), &second.draft)
        .unwrap();
    let slat_id = imported.line_ids[0];

    let err = state
        .bom_api
        .submit_bom(&second.draft, &teak_table(), "tester")
        .await
        .expect_err("命中相似组件时应被拦截");
    assert_eq!(err.blocking_lines(), &[slat_id]);

    let component_id = {
        let draft = second.draft.lock().unwrap();
        match draft.state(slat_id) {
            Some(AdvisoryState::PendingReview { matches }) => {
                assert!(matches[0].is_exact);
                assert_eq!(matches[0].cost, dec!(4.4));
                matches[0].component_id.clone()
            }
            other => panic!("意外状态: {:?}", other),
        }
    };
    second
        .draft
        .lock()
        .unwrap()
        .use_existing(slat_id, &component_id)
        .unwrap();

    let receipt = state
        .bom_api
        .submit_bom(&second.draft, &teak_table(), "tester")
        .await
        .unwrap();
    assert_eq!(receipt.product_code, "MARINA-002");
    assert_eq!(receipt.material_cost, dec!(20.40));
}

#[tokio::test]
async fn test_actual_cost_and_dashboard() {
    let (state, _db) = setup().await;
    let csv = write_csv(TEAK_TABLE_CSV).unwrap();
    let session = state.new_draft_session().await.unwrap();
    state
        .import_api
        .import_into_draft(csv.path(), &session.draft)
        .unwrap();
    let receipt = state
        .bom_api
        .submit_bom(&session.draft, &teak_table(), "tester")
        .await
        .unwrap();

    assert!(matches!(
        state
            .bom_api
            .record_actual_cost(&receipt.product_code, dec!(-1), "buyer")
            .await,
        Err(ApiError::InvalidCost { .. })
    ));

    let record = state
        .bom_api
        .record_actual_cost(&receipt.product_code, dec!(40), "buyer")
        .await
        .unwrap();
    assert_eq!(record.estimated_cost, receipt.total_cost);
    assert!(record.variance_pct().unwrap() > dec!(0));

    let stats = state.dashboard_api.get_stats().unwrap();
    assert_eq!(stats.total_products, 1);
    assert_eq!(stats.products_last_7_days, 1);
    assert!(stats.avg_abs_variance_pct.is_some());
}

#[tokio::test]
async fn test_product_listing_tracks_current_version() {
    let (state, _db) = setup().await;
    let csv = write_csv(TEAK_TABLE_CSV).unwrap();
    let session = state.new_draft_session().await.unwrap();
    state
        .import_api
        .import_into_draft(csv.path(), &session.draft)
        .unwrap();
    let receipt = state
        .bom_api
        .submit_bom(&session.draft, &teak_table(), "tester")
        .await
        .unwrap();

    let listed = state.product_api.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].code, "MARINA-001");
    assert_eq!(listed[0].total_cost, Some(receipt.total_cost));
    assert_eq!(listed[0].material_cost, Some(dec!(20.40)));

    let v2 = state.bom_api.recalculate("MARINA-001", 4, "ops").await.unwrap();
    let listed = state.product_api.list().unwrap();
    assert_eq!(listed[0].current_version, 2);
    assert_eq!(listed[0].complexity, ComplexityLevel::Complex);
    assert_eq!(listed[0].total_cost, Some(v2.total_cost));
    assert_eq!(listed[0].selling_price, Some(v2.selling_price));

    let product = state.product_api.get("MARINA-001").unwrap();
    assert_eq!(product.components.len(), 2);
    assert!(matches!(
        state.product_api.get("MARINA-404"),
        Err(ApiError::ProductNotFound(_))
    ));
}
