// ==========================================
// 排产引擎集成测试
// ==========================================
// 职责: 验证产能约束 / 优先级 / 拆分 / 重复执行的对外契约
// 场景: Consolidation → Scheduler 组合链路
// ==========================================

use chrono::NaiveDate;
use order_planning_aps::app::AppState;
use order_planning_aps::domain::order::NewSalesOrder;
use order_planning_aps::domain::types::PlanEntryStatus;

// ==========================================
// 测试辅助函数
// ==========================================

fn setup() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db").to_string_lossy().to_string();
    let state = AppState::new(db_path).unwrap();
    (state, dir)
}

fn add_order(state: &AppState, no: &str, product: &str, color: &str, qty: i64, delivery: (i32, u32, u32)) {
    state
        .order_api
        .create(&NewSalesOrder {
            order_no: no.to_string(),
            product_name: product.to_string(),
            color: color.to_string(),
            quantity: qty,
            delivery_date: NaiveDate::from_ymd_opt(delivery.0, delivery.1, delivery.2).unwrap(),
            notes: None,
        })
        .unwrap();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==========================================
// 测试1: 单批次跨天拆分 (40/日 × 90件 → 40+40+10)
// ==========================================
#[test]
fn test_batch_splits_40_40_10() {
    let (state, _dir) = setup();
    add_order(&state, "O1", "Chair", "Red", 90, (2030, 6, 10));
    state.machine_api.create("Line A", 40).unwrap();

    state.consolidation_api.run_consolidation().unwrap();
    let entries = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();

    let split: Vec<(NaiveDate, i64)> = entries
        .iter()
        .map(|e| (e.planned_date, e.quantity_planned))
        .collect();
    assert_eq!(
        split,
        vec![
            (date(2030, 6, 1), 40),
            (date(2030, 6, 2), 40),
            (date(2030, 6, 3), 10),
        ]
    );

    // 批次余量清零
    let batches = state.consolidation_api.list_batches().unwrap();
    assert_eq!(batches[0].remaining_quantity, 0);
}

// ==========================================
// 测试2: 任意 (机台, 日) 不超日产能
// ==========================================
#[test]
fn test_capacity_limit_never_exceeded() {
    let (state, _dir) = setup();
    add_order(&state, "O1", "Chair", "Red", 130, (2030, 6, 3));
    add_order(&state, "O2", "Table", "Oak", 70, (2030, 6, 4));
    add_order(&state, "O3", "Desk", "White", 55, (2030, 6, 4));
    let m1 = state.machine_api.create("Line A", 40).unwrap();
    let m2 = state.machine_api.create("Line B", 25).unwrap();

    state.consolidation_api.run_consolidation().unwrap();
    let entries = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();

    // 聚合校验产能不变式
    use std::collections::HashMap;
    let mut per_machine_day: HashMap<(i64, NaiveDate), i64> = HashMap::new();
    for e in &entries {
        *per_machine_day
            .entry((e.machine_id, e.planned_date))
            .or_insert(0) += e.quantity_planned;
    }
    for ((machine_id, day), total) in &per_machine_day {
        let capacity = if *machine_id == m1.id { 40 } else { 25 };
        assert!(
            total <= &capacity,
            "机台{}在{}排入{}超过产能{}",
            machine_id,
            day,
            total,
            capacity
        );
        assert!(*machine_id == m1.id || *machine_id == m2.id);
    }

    // 全量覆盖: 总排入 = 总需求
    let planned: i64 = entries.iter().map(|e| e.quantity_planned).sum();
    assert_eq!(planned, 130 + 70 + 55);
}

// ==========================================
// 测试3: 交期优先 + 同日富余产能让给次优批次
// ==========================================
#[test]
fn test_priority_and_slack_sharing() {
    let (state, _dir) = setup();
    add_order(&state, "O1", "Chair", "Red", 30, (2030, 6, 20));
    add_order(&state, "O2", "Table", "Oak", 25, (2030, 6, 2));
    state.machine_api.create("Line A", 40).unwrap();

    state.consolidation_api.run_consolidation().unwrap();
    let entries = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();

    let views = state
        .production_api
        .schedule_range(date(2030, 6, 1), date(2030, 6, 1))
        .unwrap();

    // 首日: 交期早的 Table 先占 25,富余 15 让给 Chair
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].product_name, "Table");
    assert_eq!(views[0].quantity_planned, 25);
    assert_eq!(views[1].product_name, "Chair");
    assert_eq!(views[1].quantity_planned, 15);

    // 次日: Chair 余量 15
    let day2 = state
        .production_api
        .schedule_range(date(2030, 6, 2), date(2030, 6, 2))
        .unwrap();
    assert_eq!(day2.len(), 1);
    assert_eq!(day2[0].product_name, "Chair");
    assert_eq!(day2[0].quantity_planned, 15);

    assert_eq!(entries.len(), 3);
}

// ==========================================
// 测试4: 重复执行只排余量
// ==========================================
#[test]
fn test_rerun_only_covers_remaining() {
    let (state, _dir) = setup();
    add_order(&state, "O1", "Chair", "Red", 60, (2030, 6, 10));
    state.machine_api.create("Line A", 40).unwrap();

    state.consolidation_api.run_consolidation().unwrap();
    let first = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();
    assert_eq!(first.len(), 2); // 40 + 20

    // 再次执行: 无余量,不再分配
    let second = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();
    assert!(second.is_empty());

    // 新批次接续在已承诺产能之后
    add_order(&state, "O2", "Table", "Oak", 30, (2030, 6, 12));
    state.consolidation_api.run_consolidation().unwrap();
    let third = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();

    // 06-01 已满(40); 06-02 已用 20,余 20; 06-03 空
    assert_eq!(
        third
            .iter()
            .map(|e| (e.planned_date, e.quantity_planned))
            .collect::<Vec<_>>(),
        vec![(date(2030, 6, 2), 20), (date(2030, 6, 3), 10)]
    );
}

// ==========================================
// 测试5: 明细状态流转（只进不退）
// ==========================================
#[test]
fn test_entry_status_transitions() {
    let (state, _dir) = setup();
    add_order(&state, "O1", "Chair", "Red", 10, (2030, 6, 10));
    state.machine_api.create("Line A", 40).unwrap();

    state.consolidation_api.run_consolidation().unwrap();
    let entries = state
        .production_api
        .generate_plan(Some(date(2030, 6, 1)))
        .unwrap();
    let id = entries[0].id;

    let entry = state
        .production_api
        .update_entry_status(id, PlanEntryStatus::InProgress)
        .unwrap();
    assert_eq!(entry.status, PlanEntryStatus::InProgress);

    let entry = state
        .production_api
        .update_entry_status(id, PlanEntryStatus::Completed)
        .unwrap();
    assert_eq!(entry.status, PlanEntryStatus::Completed);

    // 回退被拒绝
    let result = state
        .production_api
        .update_entry_status(id, PlanEntryStatus::Scheduled);
    assert!(result.is_err());
}

// ==========================================
// 测试6: 区间查询参数校验
// ==========================================
#[test]
fn test_schedule_range_rejects_inverted_range() {
    let (state, _dir) = setup();
    let result = state
        .production_api
        .schedule_range(date(2030, 6, 10), date(2030, 6, 1));
    assert!(result.is_err());
}
