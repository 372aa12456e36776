// ==========================================
// 型材库集成测试
// ==========================================
// 测试范围:
// 1. 登记与编号规则
// 2. 状态流转 NEW ⇄ REVIEW → PRODUCED
// 3. 删除约束与标准化得分
// ==========================================


use std::sync::Arc;

use bom_costing::api::{ApiError, ProfileApi};
use bom_costing::domain::{ProfileMaterial, ProfileStatus, ProfileType};
use bom_costing::repository::ProfileRepository;

use test_helpers::{create_test_db, open_shared};

fn setup() -> (ProfileApi, Arc<ProfileRepository>, tempfile::NamedTempFile) {
    let (temp_file, db_path) = create_test_db().expect("无法创建测试数据库");
    let repo = Arc::new(ProfileRepository::new(open_shared(&db_path).unwrap()));
    (ProfileApi::new(repo.clone()), repo, temp_file)
}

#[test]
fn test_register_uses_naming_rule() {
    let (api, _, _db) = setup();

    let rect = api
        .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 40.0, 20.0, 1.7)
        .unwrap();
    assert_eq!(rect.profile_id, "ALU-PROFILE-40x20x1.7");
    assert_eq!(rect.status, ProfileStatus::New);

    let tube = api
        .register(ProfileMaterial::Aluminum, ProfileType::Round, 25.0, 0.0, 1.5)
        .unwrap();
    assert_eq!(tube.profile_id, "ALU-TUBE-Ø25x1.5");

    // 重复登记
    assert!(api
        .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 40.0, 20.0, 1.7)
        .is_err());
    // 壁厚非正
    assert!(matches!(
        api.register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 40.0, 20.0, 0.0),
        Err(ApiError::ValidationFailure(_))
    ));
}

#[test]
fn test_status_lifecycle() {
    let (api, _, _db) = setup();
    let id = api
        .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 50.0, 25.0, 1.5)
        .unwrap()
        .profile_id;

    assert_eq!(api.submit_for_review(&id).unwrap().status, ProfileStatus::Review);
    assert_eq!(api.return_to_new(&id).unwrap().status, ProfileStatus::New);

    // 未确认模具不可标记为已生产
    assert!(api.mark_produced(&id, false).is_err());
    assert_eq!(api.mark_produced(&id, true).unwrap().status, ProfileStatus::Produced);

    // PRODUCED 为终态
    assert!(api.submit_for_review(&id).is_err());
    assert!(api.return_to_new(&id).is_err());
    assert_eq!(api.mark_produced(&id, true).unwrap().status, ProfileStatus::Produced);
}

#[test]
fn test_delete_only_unused() {
    let (api, repo, _db) = setup();
    let unused = api
        .register(ProfileMaterial::Aluminum, ProfileType::Square, 20.0, 20.0, 1.4)
        .unwrap()
        .profile_id;
    let used = api
        .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 55.0, 30.0, 1.6)
        .unwrap()
        .profile_id;
    repo.increment_usage(&used).unwrap();

    api.delete(&unused).unwrap();
    assert!(repo.find_by_id(&unused).unwrap().is_none());

    assert!(api.delete(&used).is_err());
    assert!(repo.find_by_id(&used).unwrap().is_some());
}

#[test]
fn test_summary_and_similar_produced() {
    let (api, _, _db) = setup();
    for (w, h, t) in [(40.0, 20.0, 1.7), (50.0, 25.0, 1.5), (20.0, 20.0, 1.4)] {
        let id = api
            .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, w, h, t)
            .unwrap()
            .profile_id;
        api.mark_produced(&id, true).unwrap();
    }
    let candidate = api
        .register(ProfileMaterial::Aluminum, ProfileType::Rectangular, 52.0, 26.0, 1.5)
        .unwrap()
        .profile_id;

    let similar = api.similar_produced(&candidate, 10.0).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].profile_id, "ALU-PROFILE-50x25x1.5");

    let summary = api.summary().unwrap();
    assert_eq!(summary.produced, 3);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.standardisation_score, 75);
}
