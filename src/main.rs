// ==========================================
// 销售订单排产系统 - 命令行入口
// ==========================================
// 技术栈: Rust + SQLite
// 用法: order-planning-aps <command> [args]
// ==========================================

use chrono::NaiveDate;
use order_planning_aps::app::{get_default_db_path, AppState};
use order_planning_aps::i18n::t_with_args;
use order_planning_aps::{logging, APP_NAME, VERSION};

#[tokio::main]
async fn main() {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&state, &args).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// 命令分发
async fn run(state: &AppState, args: &[String]) -> Result<(), String> {
    let command = args.first().map(String::as_str).unwrap_or("help");

    match command {
        // 订单合并
        "consolidate" => {
            let batches = state
                .consolidation_api
                .run_consolidation()
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                t_with_args(
                    "consolidation.batches_created",
                    &[("count", &batches.len().to_string())]
                )
            );
            print_json(&batches)
        }

        // 批次列表
        "batches" => {
            let batches = state
                .consolidation_api
                .list_batches()
                .map_err(|e| e.to_string())?;
            print_json(&batches)
        }

        // 生成排产计划
        "plan" => {
            let start_date = match args.get(1) {
                Some(raw) => Some(parse_date(raw)?),
                None => None,
            };
            let entries = state
                .production_api
                .generate_plan(start_date)
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                t_with_args(
                    "production.plan_generated",
                    &[("count", &entries.len().to_string())]
                )
            );
            print_json(&entries)
        }

        // 区间排程视图
        "schedule" => {
            let from = parse_date(args.get(1).ok_or("用法: schedule <from> <to>")?)?;
            let to = parse_date(args.get(2).ok_or("用法: schedule <from> <to>")?)?;
            let views = state
                .production_api
                .schedule_range(from, to)
                .map_err(|e| e.to_string())?;
            print_json(&views)
        }

        // 当日排程
        "today" => {
            let views = state.production_api.today_plan().map_err(|e| e.to_string())?;
            print_json(&views)
        }

        // 批次物料需求
        "requirement" => {
            let batch_id: i64 = args
                .get(1)
                .ok_or("用法: requirement <batch_id>")?
                .parse()
                .map_err(|_| "batch_id 必须为整数".to_string())?;
            let report = state
                .material_api
                .batch_requirement(batch_id)
                .map_err(|e| e.to_string())?;
            print_json(&report)
        }

        // 驾驶舱统计
        "stats" => {
            let stats = state.dashboard_api.stats().map_err(|e| e.to_string())?;
            print_json(&stats)
        }

        // 订单文件导入
        "import" => {
            let path = args.get(1).ok_or("用法: import <file.csv|file.xlsx>")?;
            let outcome = state
                .import_api
                .import_orders(path)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                t_with_args(
                    "import.done",
                    &[
                        ("created", &outcome.created.to_string()),
                        ("errors", &outcome.errors.len().to_string()),
                    ]
                )
            );
            for err in &outcome.errors {
                eprintln!("  - {}", err);
            }
            Ok(())
        }

        // 机台登记
        "add-machine" => {
            let name = args.get(1).ok_or("用法: add-machine <name> <capacity>")?;
            let capacity: i64 = args
                .get(2)
                .ok_or("用法: add-machine <name> <capacity>")?
                .parse()
                .map_err(|_| "capacity 必须为整数".to_string())?;
            let machine = state
                .machine_api
                .create(name, capacity)
                .map_err(|e| e.to_string())?;
            print_json(&machine)
        }

        // 机台列表
        "machines" => {
            let machines = state.machine_api.list().map_err(|e| e.to_string())?;
            print_json(&machines)
        }

        // 全量重置（破坏性,必须显式 --yes）
        "reset" => {
            if args.get(1).map(String::as_str) != Some("--yes") {
                return Err("reset 为破坏性操作,需显式确认: reset --yes".to_string());
            }
            let summary = state
                .consolidation_api
                .reset_all()
                .map_err(|e| e.to_string())?;
            println!("{}", order_planning_aps::i18n::t("consolidation.reset_done"));
            print_json(&summary)
        }

        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// 解析 YYYY-MM-DD 日期参数
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("日期格式非法: {} (应为 YYYY-MM-DD)", raw))
}

/// JSON 输出
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

/// 打印用法
fn print_usage() {
    println!("{} v{}", APP_NAME, VERSION);
    println!();
    println!("用法: order-planning-aps <command> [args]");
    println!();
    println!("命令:");
    println!("  consolidate              执行订单合并,输出新建批次");
    println!("  batches                  列出全部批次");
    println!("  plan [YYYY-MM-DD]        生成排产计划（缺省自当天起排）");
    println!("  schedule <from> <to>     查询日期区间排程");
    println!("  today                    查询当日排程");
    println!("  requirement <batch_id>   查询批次物料需求");
    println!("  stats                    驾驶舱统计");
    println!("  import <file>            导入订单文件 (CSV/Excel)");
    println!("  add-machine <name> <cap> 登记机台");
    println!("  machines                 列出启用机台");
    println!("  reset --yes              全量重置（破坏性）");
    println!();
    println!("环境变量: ORDER_PLANNING_APS_DB_PATH 指定数据库路径");
}
