// ==========================================
// 家具 BOM 成本核算 - 命令行入口
// ==========================================
// 技术栈: clap + tokio + SQLite
// 输出: JSON（便于脚本与前端对接）
// ==========================================

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use bom_costing::api::ApiError;
use bom_costing::app::{get_default_db_path, AppState};
use bom_costing::domain::{PackagingDims, ProductMetadata, ProfileMaterial, ProfileStatus, ProfileType};
use bom_costing::engine::AdvisoryState;
use bom_costing::{i18n, logging, APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "bom-costing", version, about = "家具 BOM 成本核算")]
struct Cli {
    /// 数据库文件路径（默认取 BOM_COSTING_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    /// 告警与描述文案语言（en / zh-CN）
    #[arg(long, global = true, default_value = "en")]
    lang: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按材料与包装成本计算成本分解（不落库）
    Cost {
        #[arg(long)]
        material: f64,
        #[arg(long, default_value_t = 0.0)]
        packaging: f64,
        /// 复杂度等级 1..=5
        #[arg(long, default_value_t = 3)]
        level: i64,
    },

    /// 导入 BOM 表格并提交
    Submit {
        /// BOM 文件（.csv / .xlsx / .xls）
        file: PathBuf,
        /// 产品名称
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        product_type: String,
        #[arg(long, default_value = "")]
        main_material: String,
        #[arg(long, default_value_t = 3)]
        level: i64,
        /// 包装箱尺寸 长x宽x高 (cm)，如 120x80x60
        #[arg(long)]
        carton: Option<String>,
        /// 人工指定包装成本
        #[arg(long)]
        packaging_cost: Option<String>,
        /// 待确认的相似组件一律按新组件提交
        #[arg(long)]
        accept_new: bool,
        #[arg(long, default_value = "cli")]
        operator: String,
    },

    /// 以新复杂度重算（追加成本版本）
    Recalc {
        product_code: String,
        #[arg(long)]
        level: i64,
        #[arg(long, default_value = "cli")]
        operator: String,
    },

    /// 成本版本历史（最新在前）
    Versions { product_code: String },

    /// 录入工厂实际报价
    Actual {
        product_code: String,
        #[arg(long)]
        cost: String,
        #[arg(long, default_value = "cli")]
        operator: String,
    },

    /// 产品列表；指定编码时输出该产品及组件行
    Products {
        product_code: Option<String>,
    },

    /// 型材库
    #[command(subcommand)]
    Profiles(ProfileCommands),

    /// 查询原材料
    Materials {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        include_inactive: bool,
    },

    /// 看板指标
    Dashboard,

    /// 核算配置
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// 列出型材（可按状态过滤）
    List {
        #[arg(long)]
        status: Option<String>,
    },
    /// 登记新型材
    Register {
        #[arg(long, default_value = "ALUMINUM")]
        material: String,
        #[arg(long, default_value = "RECTANGULAR")]
        profile_type: String,
        #[arg(long, default_value_t = 0.0)]
        width: f64,
        #[arg(long, default_value_t = 0.0)]
        height: f64,
        #[arg(long)]
        thickness: f64,
    },
    /// NEW → REVIEW
    Review { profile_id: String },
    /// → PRODUCED（须确认模具已存在）
    Produce {
        profile_id: String,
        #[arg(long)]
        tooling_confirmed: bool,
    },
    /// 删除未被使用的型材
    Delete { profile_id: String },
    /// 标准化汇总
    Summary,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// 当前配置
    Show,
    /// 导出配置快照
    Export,
    /// 设置远程目录服务地址（空字符串表示使用本地目录）
    Remote {
        endpoint: String,
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("{} 不是有效金额: {}", field, raw))
}

fn parse_carton(raw: &str) -> Result<PackagingDims> {
    let parts: Vec<f64> = raw
        .split(['x', 'X', '*'])
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("包装箱尺寸格式应为 长x宽x高: {}", raw))?;
    match parts.as_slice() {
        [l, w, h] => Ok(PackagingDims::new(*l, *w, *h)),
        _ => bail!("包装箱尺寸格式应为 长x宽x高: {}", raw),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(logging::LogFormat::from_flag(cli.json_logs));
    i18n::set_locale(&cli.lang);

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).await.map_err(|e| anyhow!(e))?;

    match cli.command {
        Commands::Cost {
            material,
            packaging,
            level,
        } => {
            let breakdown = state.bom_api.compute_cost(material, packaging, level).await?;
            eprintln!("{}", i18n::complexity_label(breakdown.complexity));
            print_json(&breakdown)
        }

        Commands::Submit {
            file,
            name,
            product_type,
            main_material,
            level,
            carton,
            packaging_cost,
            accept_new,
            operator,
        } => {
            let mut metadata = ProductMetadata::new(name);
            metadata.product_type = product_type;
            metadata.main_material = main_material;
            metadata.complexity = level.try_into()?;
            if let Some(raw) = carton {
                metadata.packaging = parse_carton(&raw)?;
            }
            if let Some(raw) = packaging_cost {
                metadata.packaging_cost_override = Some(parse_decimal("packaging_cost", &raw)?);
            }

            let session = state.new_draft_session().await.map_err(|e| anyhow!(e))?;
            let imported = state.import_api.import_into_draft(&file, &session.draft)?;
            tracing::info!(imported = imported.imported, "BOM 行已导入");

            let receipt = match state
                .bom_api
                .submit_bom(&session.draft, &metadata, &operator)
                .await
            {
                Err(err @ ApiError::UnresolvedSimilarMatches { .. }) if accept_new => {
                    {
                        let mut draft = session
                            .draft
                            .lock()
                            .map_err(|e| anyhow!("草稿锁获取失败: {}", e))?;
                        for line_id in err.blocking_lines() {
                            draft.confirm_new(*line_id)?;
                        }
                    }
                    state
                        .bom_api
                        .submit_bom(&session.draft, &metadata, &operator)
                        .await?
                }
                Err(err @ ApiError::UnresolvedSimilarMatches { .. }) => {
                    let draft = session
                        .draft
                        .lock()
                        .map_err(|e| anyhow!("草稿锁获取失败: {}", e))?;
                    for line_id in err.blocking_lines() {
                        if let Some(AdvisoryState::PendingReview { matches }) = draft.state(*line_id) {
                            eprintln!("{} 相似组件:", line_id);
                            for m in matches {
                                eprintln!(
                                    "  {} {}x{}x{} ${} 已使用 {} 次{}",
                                    m.component_id,
                                    m.length,
                                    m.width,
                                    m.thickness,
                                    m.cost.round_dp(2),
                                    m.times_used,
                                    if m.is_exact { "（完全一致）" } else { "" }
                                );
                            }
                        }
                    }
                    return Err(err.into());
                }
                other => other?,
            };
            print_json(&receipt)
        }

        Commands::Recalc {
            product_code,
            level,
            operator,
        } => print_json(&state.bom_api.recalculate(&product_code, level, &operator).await?),

        Commands::Versions { product_code } => {
            print_json(&state.bom_api.get_cost_versions(&product_code).await?)
        }

        Commands::Actual {
            product_code,
            cost,
            operator,
        } => {
            let actual = parse_decimal("cost", &cost)?;
            print_json(
                &state
                    .bom_api
                    .record_actual_cost(&product_code, actual, &operator)
                    .await?,
            )
        }

        Commands::Profiles(cmd) => match cmd {
            ProfileCommands::List { status } => {
                let status = status.as_deref().map(ProfileStatus::from_str);
                print_json(&state.profile_api.list(status)?)
            }
            ProfileCommands::Register {
                material,
                profile_type,
                width,
                height,
                thickness,
            } => {
                let material = ProfileMaterial::parse(&material)
                    .ok_or_else(|| anyhow!("未知型材材质: {}", material))?;
                let profile_type = ProfileType::parse(&profile_type)
                    .ok_or_else(|| anyhow!("未知型材类型: {}", profile_type))?;
                print_json(
                    &state
                        .profile_api
                        .register(material, profile_type, width, height, thickness)?,
                )
            }
            ProfileCommands::Review { profile_id } => {
                print_json(&state.profile_api.submit_for_review(&profile_id)?)
            }
            ProfileCommands::Produce {
                profile_id,
                tooling_confirmed,
            } => print_json(&state.profile_api.mark_produced(&profile_id, tooling_confirmed)?),
            ProfileCommands::Delete { profile_id } => {
                state.profile_api.delete(&profile_id)?;
                println!("已删除 {}", profile_id);
                Ok(())
            }
            ProfileCommands::Summary => print_json(&state.profile_api.summary()?),
        },

        Commands::Materials {
            keyword,
            category,
            include_inactive,
        } => print_json(&state.material_api.search(
            keyword.as_deref(),
            category.as_deref(),
            include_inactive,
        )?),

        Commands::Products { product_code } => match product_code {
            Some(code) => print_json(&state.product_api.get(&code)?),
            None => print_json(&state.product_api.list()?),
        },

        Commands::Dashboard => print_json(&state.dashboard_api.get_stats()?),

        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => print_json(&state.config_api.get_settings().await?),
            ConfigCommands::Export => {
                println!("{}", state.config_api.export_snapshot()?);
                Ok(())
            }
            ConfigCommands::Remote {
                endpoint,
                timeout_secs,
            } => {
                state.config_api.set_remote_endpoint(&endpoint, timeout_secs)?;
                println!("远程目录服务已更新，下次启动生效");
                Ok(())
            }
        },
    }
}
