// ==========================================
// 销售订单排产系统 - 产品/原材料/BOM 数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 不变式: (product, raw_material) 唯一,重复映射走 UPSERT 更新用量
// ==========================================

use crate::domain::bom::{BomLine, Product, RawMaterial};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// BomRepository - 产品与物料清单仓储
// ==========================================
pub struct BomRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BomRepository {
    /// 创建新的BomRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 原材料
    // ==========================================

    /// 创建原材料
    pub fn insert_material(&self, name: &str, unit: &str) -> RepositoryResult<RawMaterial> {
        let conn = self.get_conn()?;
        let created_at = Utc::now().naive_utc();
        conn.execute(
            "INSERT INTO raw_material (name, unit, created_at) VALUES (?1, ?2, ?3)",
            params![
                name,
                unit,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        Ok(RawMaterial {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            unit: unit.to_string(),
            created_at,
        })
    }

    /// 查询全部原材料
    pub fn list_materials(&self) -> RepositoryResult<Vec<RawMaterial>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, unit, created_at FROM raw_material ORDER BY id")?;
        let rows = stmt.query_map([], Self::map_material_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 按ID查询原材料
    pub fn find_material_by_id(&self, id: i64) -> RepositoryResult<Option<RawMaterial>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                "SELECT id, name, unit, created_at FROM raw_material WHERE id = ?1",
                params![id],
                Self::map_material_row,
            )
            .optional()?;
        Ok(material)
    }

    // ==========================================
    // 产品
    // ==========================================

    /// 创建产品（名称唯一）
    pub fn insert_product(&self, name: &str) -> RepositoryResult<Product> {
        let conn = self.get_conn()?;
        let created_at = Utc::now().naive_utc();
        conn.execute(
            "INSERT INTO product (name, created_at) VALUES (?1, ?2)",
            params![name, created_at.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;
        Ok(Product {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    /// 查询全部产品
    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM product ORDER BY id")?;
        let rows = stmt.query_map([], Self::map_product_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 按ID查询产品
    pub fn find_product_by_id(&self, id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT id, name, created_at FROM product WHERE id = ?1",
                params![id],
                Self::map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    /// 按名称精确查询产品（区分大小写）
    pub fn find_product_by_name(&self, name: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        Self::find_product_by_name_on(&conn, name)
    }

    // ==========================================
    // BOM 映射
    // ==========================================

    /// 建立/更新产品-原材料映射
    ///
    /// 同一 (product, raw_material) 重复映射时更新 quantity_per_unit 而非新增
    pub fn upsert_bom_line(
        &self,
        product_id: i64,
        raw_material_id: i64,
        quantity_per_unit: f64,
    ) -> RepositoryResult<BomLine> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO product_raw_material (product_id, raw_material_id, quantity_per_unit)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(product_id, raw_material_id)
               DO UPDATE SET quantity_per_unit = excluded.quantity_per_unit"#,
            params![product_id, raw_material_id, quantity_per_unit],
        )?;

        let line = conn.query_row(
            r#"SELECT id, product_id, raw_material_id, quantity_per_unit
                 FROM product_raw_material
                WHERE product_id = ?1 AND raw_material_id = ?2"#,
            params![product_id, raw_material_id],
            Self::map_bom_row,
        )?;
        Ok(line)
    }

    /// 产品的 BOM 行及对应原材料，按插入顺序
    pub fn bom_lines_for_product(
        &self,
        product_id: i64,
    ) -> RepositoryResult<Vec<(BomLine, RawMaterial)>> {
        let conn = self.get_conn()?;
        Self::bom_lines_for_product_on(&conn, product_id)
    }

    // ==========================================
    // 事务内关联函数（供引擎在单事务中组合调用）
    // ==========================================

    /// 按名称精确查询产品（事务内可用）
    pub fn find_product_by_name_on(conn: &Connection, name: &str) -> RepositoryResult<Option<Product>> {
        let product = conn
            .query_row(
                "SELECT id, name, created_at FROM product WHERE name = ?1",
                params![name],
                Self::map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    /// 产品的 BOM 行及对应原材料（事务内可用），按插入顺序
    pub fn bom_lines_for_product_on(
        conn: &Connection,
        product_id: i64,
    ) -> RepositoryResult<Vec<(BomLine, RawMaterial)>> {
        let mut stmt = conn.prepare(
            r#"SELECT prm.id, prm.product_id, prm.raw_material_id, prm.quantity_per_unit,
                      rm.id, rm.name, rm.unit, rm.created_at
                 FROM product_raw_material prm
                 JOIN raw_material rm ON rm.id = prm.raw_material_id
                WHERE prm.product_id = ?1
                ORDER BY prm.id"#,
        )?;
        let rows = stmt.query_map(params![product_id], |row| {
            let line = BomLine {
                id: row.get(0)?,
                product_id: row.get(1)?,
                raw_material_id: row.get(2)?,
                quantity_per_unit: row.get(3)?,
            };
            let created_raw: String = row.get(7)?;
            let material = RawMaterial {
                id: row.get(4)?,
                name: row.get(5)?,
                unit: row.get(6)?,
                created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S")
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            7,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
            };
            Ok((line, material))
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_material_row(row: &rusqlite::Row) -> rusqlite::Result<RawMaterial> {
        let created_raw: String = row.get(3)?;
        Ok(RawMaterial {
            id: row.get(0)?,
            name: row.get(1)?,
            unit: row.get(2)?,
            created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
        })
    }

    fn map_product_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        let created_raw: String = row.get(2)?;
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: NaiveDateTime::parse_from_str(&created_raw, "%Y-%m-%d %H:%M:%S").map_err(
                |e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                },
            )?,
        })
    }

    fn map_bom_row(row: &rusqlite::Row) -> rusqlite::Result<BomLine> {
        Ok(BomLine {
            id: row.get(0)?,
            product_id: row.get(1)?,
            raw_material_id: row.get(2)?,
            quantity_per_unit: row.get(3)?,
        })
    }
}
