// ==========================================
// 家具 BOM 成本核算 - 参考数据初始化
// ==========================================
// 用法: seed_reference_data [db_path] [--reset]
// 写入常用型材与原材料单价，已存在的记录保持不变（原材料按编号覆盖）
// ==========================================

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bom_costing::app::get_default_db_path;
use bom_costing::db::{init_schema, open_sqlite_connection};
use bom_costing::domain::{
    MaterialUnit, Profile, ProfileMaterial, ProfileStatus, ProfileType, RawMaterial,
};
use bom_costing::logging;
use bom_costing::repository::{MaterialRepository, ProfileRepository};

// (截面, 宽, 高, 壁厚, 状态, 使用产品数)
const PROFILES: &[(ProfileType, f64, f64, f64, ProfileStatus, u32)] = &[
    (ProfileType::Rectangular, 40.0, 20.0, 1.7, ProfileStatus::Produced, 23),
    (ProfileType::Rectangular, 50.0, 25.0, 1.5, ProfileStatus::Produced, 8),
    (ProfileType::Square, 20.0, 20.0, 1.4, ProfileStatus::Produced, 15),
    (ProfileType::Round, 60.0, 0.0, 1.5, ProfileStatus::Produced, 4),
    (ProfileType::Round, 25.0, 0.0, 1.5, ProfileStatus::Produced, 12),
    (ProfileType::Rectangular, 55.0, 30.0, 1.6, ProfileStatus::New, 1),
];

fn materials() -> Vec<RawMaterial> {
    let item = |id: &str, category: &str, name: &str, unit: MaterialUnit, cost: Decimal| RawMaterial {
        material_id: id.to_string(),
        category: category.to_string(),
        name: name.to_string(),
        unit,
        unit_cost: cost,
        active: true,
    };

    vec![
        item("WOOD-ACACIA-STD", "WOOD", "Acacia 标准板", MaterialUnit::M3, dec!(1040)),
        item("WOOD-TEAK-STD", "WOOD", "Teak 标准板", MaterialUnit::M3, dec!(2200)),
        item("WOOD-EUCALYPTUS-STD", "WOOD", "Eucalyptus 标准板", MaterialUnit::M3, dec!(780)),
        item("WOOD-KAMERERE-STD", "WOOD", "Kamerere 标准板", MaterialUnit::M3, dec!(690)),
        item("ALU-PROFILE-40x20x1.7", "ALUMINUM", "铝方管 40x20x1.7", MaterialUnit::Kg, dec!(2.20)),
        item("ALU-PROFILE-50x25x1.5", "ALUMINUM", "铝方管 50x25x1.5", MaterialUnit::Kg, dec!(2.20)),
        item("ALU-PROFILE-20x20x1.4", "ALUMINUM", "铝方管 20x20x1.4", MaterialUnit::Kg, dec!(2.25)),
        item("ALU-TUBE-Ø60x1.5", "ALUMINUM", "铝圆管 Ø60x1.5", MaterialUnit::Kg, dec!(2.30)),
        item("ALU-TUBE-Ø25x1.5", "ALUMINUM", "铝圆管 Ø25x1.5", MaterialUnit::Kg, dec!(2.30)),
        item("FABRIC-OUTDOOR-STD", "FABRIC", "户外面料", MaterialUnit::M2, dec!(3.60)),
        item("FOAM-STD", "FOAM", "海绵", MaterialUnit::M3, dec!(95)),
        item("CUSHION-INSERT-STD", "CUSHION", "坐垫内芯", MaterialUnit::Pcs, dec!(6.50)),
        item("HARDWARE-STD", "HARDWARE", "五金件", MaterialUnit::Pcs, dec!(0.35)),
        item("ACCESSORIES-STD", "ACCESSORIES", "配件", MaterialUnit::Pcs, dec!(0.80)),
        item("ROPE-STD", "ROPE", "编织绳", MaterialUnit::M, dec!(0.18)),
        item("TEXTILENE-STD", "TEXTILENE", "特斯林网布", MaterialUnit::M2, dec!(4.20)),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init(logging::LogFormat::Pretty);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let reset = args.iter().any(|a| a == "--reset");
    let db_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(get_default_db_path);

    if reset {
        backup_and_reset_db(&db_path)?;
    }

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let profile_repo = ProfileRepository::new(conn.clone());
    let mut profiles_added = 0;
    for (profile_type, width, height, thickness, status, products_using) in PROFILES {
        let mut profile =
            Profile::new(ProfileMaterial::Aluminum, *profile_type, *width, *height, *thickness);
        if profile_repo.find_by_id(&profile.profile_id)?.is_some() {
            continue;
        }
        profile.status = *status;
        profile.products_using = *products_using;
        profile_repo.insert(&profile)?;
        profiles_added += 1;
    }

    let material_repo = MaterialRepository::new(conn);
    let materials = materials();
    for material in &materials {
        material_repo.upsert(material)?;
    }

    eprintln!("数据库: {}", db_path);
    eprintln!("型材新增 {} 条，原材料写入 {} 条", profiles_added, materials.len());
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("已备份 {} -> {}", db_path, backup_path);
    Ok(())
}
