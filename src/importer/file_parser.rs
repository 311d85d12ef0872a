// ==========================================
// 销售订单排产系统 - 订单文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 表头 → 单元格文本 的行映射（统一做 trim）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 解析后的一行: 表头 → 单元格文本
pub type RawRecord = HashMap<String, String>;

// ==========================================
// UniversalFileParser - 按扩展名分发的文件解析器
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析文件为行映射列表（跳过全空行）
    pub fn parse<P: AsRef<Path>>(file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Self::parse_csv(path),
            "xlsx" | "xls" => Self::parse_excel(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }

    /// CSV 解析
    fn parse_csv(path: &Path) -> ImportResult<Vec<RawRecord>> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ImportError::CsvParseError(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| ImportError::CsvParseError(e.to_string()))?;
            let row = Self::zip_row(&headers, record.iter());
            if !row.values().all(|v| v.is_empty()) {
                records.push(row);
            }
        }
        Ok(records)
    }

    /// Excel 解析（读取第一个工作表）
    fn parse_excel(path: &Path) -> ImportResult<Vec<RawRecord>> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let cells = data_row.iter().map(|c| c.to_string());
            let row = Self::zip_row_owned(&headers, cells);
            if !row.values().all(|v| v.is_empty()) {
                records.push(row);
            }
        }
        Ok(records)
    }

    fn zip_row<'a>(headers: &[String], cells: impl Iterator<Item = &'a str>) -> RawRecord {
        let mut row = HashMap::new();
        for (idx, value) in cells.enumerate() {
            if let Some(header) = headers.get(idx) {
                row.insert(header.clone(), value.trim().to_string());
            }
        }
        row
    }

    fn zip_row_owned(headers: &[String], cells: impl Iterator<Item = String>) -> RawRecord {
        let mut row = HashMap::new();
        for (idx, value) in cells.enumerate() {
            if let Some(header) = headers.get(idx) {
                row.insert(header.clone(), value.trim().to_string());
            }
        }
        row
    }
}
