// ==========================================
// 故障知识库 - 表格文件解析器
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls，仅第一个工作表)
// 输出: ParsedTable（列顺序 = 表头顺序，单元格永不缺失，空值为 ""）
// ==========================================

use crate::domain::import::{ParsedTable, RawRow};
use crate::importer::entry_importer_trait::FileParser;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::Timelike;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 空表头占位名（与常见表格库的命名一致）
const EMPTY_HEADER: &str = "__EMPTY";

/// 支持的源文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    /// 按扩展名（不区分大小写）识别文件类型
    pub fn from_path(path: &Path) -> ImportResult<SourceFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" | "xls" => Ok(SourceFormat::Workbook),
            _ => Err(ImportError::unsupported(ext)),
        }
    }
}

/// 表头规范化：TRIM；空表头命名为 __EMPTY / __EMPTY_1 …；重名追加 _1 / _2 …
fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers: Vec<String> = Vec::new();
    for cell in raw {
        let base = match cell.as_ref().trim() {
            "" => EMPTY_HEADER.to_string(),
            name => name.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 0;
        while headers.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", base, suffix);
        }
        headers.push(candidate);
    }
    headers
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        let path = file_path;

        // 扩展名检查先于任何读取
        if SourceFormat::from_path(path)? != SourceFormat::Csv {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            return Err(ImportError::unsupported(ext));
        }
        ensure_exists(path)?;

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let raw_headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                // 去掉 UTF-8 BOM
                if idx == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();
        let columns = normalize_headers(raw_headers);

        // 仅由分隔符组成的行保留（计入总行数，由执行器计为跳过）
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: RawRow = columns
                .iter()
                .enumerate()
                .map(|(idx, col)| (col.clone(), record.get(idx).unwrap_or("").to_string()))
                .collect();
            rows.push(row);
        }

        tracing::debug!(
            file = %path.display(),
            columns = columns.len(),
            rows = rows.len(),
            "CSV 解析完成"
        );
        Ok(ParsedTable { columns, rows })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

/// 单元格转文本
///
/// - 日期: YYYY-MM-DD（含时间部分时为 YYYY-MM-DD HH:MM:SS）
/// - 整数值浮点数: 不带 ".0"
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        let path = file_path;

        if SourceFormat::from_path(path)? != SourceFormat::Workbook {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            return Err(ImportError::unsupported(ext));
        }
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;

        // 只读第一个工作表
        let sheet_name = match workbook.sheet_names().first() {
            Some(name) => name.clone(),
            None => return Err(ImportError::ParseFailure("工作簿中没有工作表".to_string())),
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut sheet_rows = range.rows();
        let columns = match sheet_rows.next() {
            Some(header_row) => normalize_headers(header_row.iter().map(cell_to_string)),
            None => {
                tracing::debug!(file = %path.display(), sheet = %sheet_name, "工作表为空");
                return Ok(ParsedTable::default());
            }
        };

        let mut rows = Vec::new();
        for data_row in sheet_rows {
            let values: Vec<String> = data_row.iter().map(cell_to_string).collect();

            // 跳过完全空白的行
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let row: RawRow = columns
                .iter()
                .enumerate()
                .map(|(idx, col)| (col.clone(), values.get(idx).cloned().unwrap_or_default()))
                .collect();
            rows.push(row);
        }

        tracing::debug!(
            file = %path.display(),
            sheet = %sheet_name,
            columns = columns.len(),
            rows = rows.len(),
            "工作簿解析完成"
        );
        Ok(ParsedTable { columns, rows })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        match SourceFormat::from_path(file_path)? {
            SourceFormat::Csv => CsvParser.parse(file_path),
            SourceFormat::Workbook => ExcelParser.parse(file_path),
        }
    }
}
