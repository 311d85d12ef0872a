// ==========================================
// 销售订单排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等化：init_schema 可在任意已有库上重复执行
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化业务表结构（幂等）
///
/// 建表顺序注意外键依赖：machine / product / raw_material 先建，
/// sales_order 依赖 consolidated_batch，plan_entry 依赖二者。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS machine (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            capacity_per_day INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS raw_material (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT 'kg',
            created_at TEXT NOT NULL
        );

        -- 产品-原材料映射：同一 (product, raw_material) 至多一条，重复映射走 UPSERT
        CREATE TABLE IF NOT EXISTS product_raw_material (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES product(id),
            raw_material_id INTEGER NOT NULL REFERENCES raw_material(id),
            quantity_per_unit REAL NOT NULL,
            UNIQUE(product_id, raw_material_id)
        );

        CREATE TABLE IF NOT EXISTS consolidated_batch (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL,
            color TEXT NOT NULL,
            total_quantity INTEGER NOT NULL,
            remaining_quantity INTEGER NOT NULL,
            order_nos TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- 同一订单号允许多个行项目（产品+颜色不同），整行唯一
        CREATE TABLE IF NOT EXISTS sales_order (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_no TEXT NOT NULL,
            product_name TEXT NOT NULL,
            color TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            delivery_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            batch_id INTEGER REFERENCES consolidated_batch(id),
            notes TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(order_no, product_name, color)
        );

        CREATE TABLE IF NOT EXISTS plan_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            planned_date TEXT NOT NULL,
            batch_id INTEGER REFERENCES consolidated_batch(id),
            quantity_planned INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'scheduled',
            machine_id INTEGER NOT NULL REFERENCES machine(id),
            created_at TEXT NOT NULL
        );

        -- 已承诺产能按 (machine, date) 聚合推导，这两个索引保证推导查询走索引
        CREATE INDEX IF NOT EXISTS idx_plan_entry_machine_date ON plan_entry(machine_id, planned_date);
        CREATE INDEX IF NOT EXISTS idx_plan_entry_date ON plan_entry(planned_date);
        CREATE INDEX IF NOT EXISTS idx_plan_entry_batch ON plan_entry(batch_id);
        CREATE INDEX IF NOT EXISTS idx_sales_order_status ON sales_order(status);
        CREATE INDEX IF NOT EXISTS idx_sales_order_batch ON sales_order(batch_id);
        "#,
    )?;
    Ok(())
}
