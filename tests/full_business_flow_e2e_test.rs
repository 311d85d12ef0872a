// ==========================================
// 全业务流端到端测试
// ==========================================
// 链路: 订单导入/录入 → 合并 → 排产 → 完工 → 驾驶舱
// ==========================================

use chrono::{Duration, Local, NaiveDate};
use order_planning_aps::app::AppState;
use order_planning_aps::domain::order::NewSalesOrder;
use order_planning_aps::domain::types::{OrderStatus, PlanEntryStatus};
use std::io::Write;

// ==========================================
// 测试辅助函数
// ==========================================

fn setup() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db").to_string_lossy().to_string();
    let state = AppState::new(db_path).unwrap();
    (state, dir)
}

fn add_order(state: &AppState, no: &str, product: &str, color: &str, qty: i64, delivery: NaiveDate) {
    state
        .order_api
        .create(&NewSalesOrder {
            order_no: no.to_string(),
            product_name: product.to_string(),
            color: color.to_string(),
            quantity: qty,
            delivery_date: delivery,
            notes: None,
        })
        .unwrap();
}

// ==========================================
// 测试1: 录单 → 合并 → 排产 → 全部完工 → 订单完工
// ==========================================
#[test]
fn test_full_flow_to_completion() {
    let (state, _dir) = setup();
    let today = Local::now().date_naive();
    let next_week = today + Duration::days(7);

    add_order(&state, "SO-001", "Chair", "Red", 30, next_week);
    add_order(&state, "SO-002", "Chair", "Red", 20, next_week);
    state.machine_api.create("Line A", 40).unwrap();

    // 合并
    let batches = state.consolidation_api.run_consolidation().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].total_quantity, 50);

    // 排产: 自今日起 40 + 10
    let entries = state.production_api.generate_plan(Some(today)).unwrap();
    assert_eq!(entries.len(), 2);

    // 当日排程可见,携带批次产品/颜色
    let today_plan = state.production_api.today_plan().unwrap();
    assert_eq!(today_plan.len(), 1);
    assert_eq!(today_plan[0].product_name, "Chair");
    assert_eq!(today_plan[0].color, "Red");
    assert_eq!(today_plan[0].quantity_planned, 40);

    // 未完工前订单为 consolidated
    let views = state.order_api.list(Some(OrderStatus::Consolidated)).unwrap();
    assert_eq!(views.len(), 2);

    // 第一条完工,订单仍未完工
    state
        .production_api
        .update_entry_status(entries[0].id, PlanEntryStatus::Completed)
        .unwrap();
    assert!(state
        .order_api
        .list(Some(OrderStatus::Completed))
        .unwrap()
        .is_empty());

    // 全部完工 → 订单推导为 completed
    state
        .production_api
        .update_entry_status(entries[1].id, PlanEntryStatus::Completed)
        .unwrap();
    let completed = state.order_api.list(Some(OrderStatus::Completed)).unwrap();
    assert_eq!(completed.len(), 2);
}

// ==========================================
// 测试2: 驾驶舱聚合（待合并/延误推导）
// ==========================================
#[test]
fn test_dashboard_stats_with_delayed_orders() {
    let (state, _dir) = setup();
    let today = Local::now().date_naive();
    let yesterday = today - Duration::days(1);
    let next_week = today + Duration::days(7);

    // 未合并且交期已过 → delayed; 未合并且交期未到 → pending
    add_order(&state, "SO-001", "Chair", "Red", 30, yesterday);
    add_order(&state, "SO-002", "Table", "Oak", 20, next_week);

    let stats = state.dashboard_api.stats().unwrap();
    assert_eq!(stats.pending_orders_count, 1);
    assert_eq!(stats.delayed_orders_count, 1);
    assert_eq!(stats.completed_orders_count, 0);
    assert_eq!(stats.today_plan_count, 0);
    assert_eq!(stats.pending_orders[0].order_no, "SO-002");
    assert_eq!(stats.delayed_orders[0].order_no, "SO-001");
    assert_eq!(stats.delayed_orders[0].status, OrderStatus::Delayed);

    // 合并+排产后,今日计划进入驾驶舱
    state.machine_api.create("Line A", 100).unwrap();
    state.consolidation_api.run_consolidation().unwrap();
    state.production_api.generate_plan(Some(today)).unwrap();

    let stats = state.dashboard_api.stats().unwrap();
    // 两个批次都在今日落位（产能充足）
    assert_eq!(stats.today_plan_count, 2);
    assert_eq!(stats.pending_orders_count, 0);
    // 交期已过的订单合并后仍显示延误
    assert_eq!(stats.delayed_orders_count, 1);
}

// ==========================================
// 测试3: 文件导入进入同一台账并可走完整链路
// ==========================================
#[tokio::test]
async fn test_import_then_consolidate() {
    let (state, _dir) = setup();

    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(csv, "Order ID,Product Name,Quantity,Color,Delivery Date").unwrap();
    writeln!(csv, "IMP-1,Chair,30,Red,2030-06-01").unwrap();
    writeln!(csv, "IMP-2,Chair,20,Red,2030-06-05").unwrap();
    writeln!(csv, "IMP-2,Chair,99,Red,2030-06-05").unwrap(); // 重复行

    let outcome = state.import_api.import_orders(csv.path()).await.unwrap();
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.errors.len(), 1);

    let batches = state.consolidation_api.run_consolidation().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].total_quantity, 50);
    assert_eq!(batches[0].order_nos, vec!["IMP-1", "IMP-2"]);
}

// ==========================================
// 测试4: 重复录单被拒绝
// ==========================================
#[test]
fn test_duplicate_order_line_rejected() {
    let (state, _dir) = setup();
    let next_week = Local::now().date_naive() + Duration::days(7);

    add_order(&state, "SO-001", "Chair", "Red", 30, next_week);
    let result = state.order_api.create(&NewSalesOrder {
        order_no: "SO-001".to_string(),
        product_name: "Chair".to_string(),
        color: "Red".to_string(),
        quantity: 10,
        delivery_date: next_week,
        notes: None,
    });
    assert!(result.is_err());

    // 同订单号不同产品/颜色是合法的行项目
    add_order(&state, "SO-001", "Chair", "Blue", 10, next_week);
    assert_eq!(state.order_api.list(None).unwrap().len(), 2);
}
