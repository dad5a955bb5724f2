//! Workbook adapter
//!
//! Decodes uploaded CSV and Excel files into [`Sheet`] grids. This is the only
//! place the engine touches file formats; everything downstream works on
//! in-memory cells.

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, DataType, Range, Reader, Xls, Xlsx};
use lcm_models::{Cell, Sheet};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Supported workbook formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Csv,
    Excel,
    /// Legacy binary `.xls`
    ExcelLegacy,
}

impl WorkbookFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Excel),
            "xls" => Some(Self::ExcelLegacy),
            _ => None,
        }
    }

    /// Detect format from content type header
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "text/csv" | "application/csv" => Some(Self::Csv),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some(Self::Excel),
            "application/vnd.ms-excel" => Some(Self::ExcelLegacy),
            _ => None,
        }
    }
}

/// Every sheet of one uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub file_name: String,
    pub format: WorkbookFormat,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Default)]
pub struct WorkbookLoader;

impl WorkbookLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load_path(&self, path: &Path) -> Result<Workbook> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read workbook {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Workbook path has no file name")?;
        self.load_bytes(file_name, &data, None)
    }

    /// Decode a workbook from bytes; the format falls back to the file extension
    pub fn load_bytes(
        &self,
        file_name: &str,
        data: &[u8],
        format: Option<WorkbookFormat>,
    ) -> Result<Workbook> {
        let format = format
            .or_else(|| WorkbookFormat::from_extension(Path::new(file_name)))
            .context("Could not determine workbook format")?;

        let sheets = match format {
            WorkbookFormat::Csv => vec![self.load_csv(file_name, data)?],
            WorkbookFormat::Excel => {
                let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
                    .context("Failed to open Excel workbook")?;
                read_sheets(&mut workbook)?
            }
            WorkbookFormat::ExcelLegacy => {
                let mut workbook: Xls<_> = open_workbook_from_rs(Cursor::new(data))
                    .context("Failed to open legacy Excel workbook")?;
                read_sheets(&mut workbook)?
            }
        };

        tracing::info!(
            file = file_name,
            ?format,
            sheets = sheets.len(),
            "Workbook loaded"
        );

        Ok(Workbook {
            file_name: file_name.to_string(),
            format,
            sheets,
        })
    }

    /// A CSV file is a single sheet named after the file stem
    fn load_csv(&self, file_name: &str, data: &[u8]) -> Result<Sheet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Row {}: CSV parse error", idx + 1))?;
            rows.push(record.iter().map(Cell::from).collect());
        }

        let name = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        Ok(Sheet::new(name, rows))
    }
}

fn read_sheets<RS, R>(workbook: &mut R) -> Result<Vec<Sheet>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());

    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Worksheet '{}' not found", name))?
            .with_context(|| format!("Failed to read worksheet '{}'", name))?;
        sheets.push(Sheet::new(name, range_to_rows(&range)));
    }

    Ok(sheets)
}

/// Ranges start at the first used cell; pad back to absolute A1 positions so
/// row indices match what a user sees in the spreadsheet
fn range_to_rows(range: &Range<DataType>) -> Vec<Vec<Cell>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }
    rows
}

fn convert_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty | DataType::Error(_) => Cell::Empty,
        DataType::String(s) => Cell::from(s.as_str()),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            WorkbookFormat::from_extension(Path::new("Lenovo Q3 2025.XLSX")),
            Some(WorkbookFormat::Excel)
        );
        assert_eq!(
            WorkbookFormat::from_extension(Path::new("old.xls")),
            Some(WorkbookFormat::ExcelLegacy)
        );
        assert_eq!(WorkbookFormat::from_extension(Path::new("notes.txt")), None);
        assert_eq!(
            WorkbookFormat::from_content_type("text/csv"),
            Some(WorkbookFormat::Csv)
        );
    }

    #[test]
    fn test_csv_becomes_single_sheet() {
        let data = b"Lenovo lots,,\nPart number,Description,Price in USD\n7D73CTO1WW,SMI1 Rack Server,\"12,000\"\n,,\n";
        let workbook = WorkbookLoader::new()
            .load_bytes("dell_q1_2024.csv", data, None)
            .unwrap();

        assert_eq!(workbook.format, WorkbookFormat::Csv);
        assert_eq!(workbook.sheets.len(), 1);
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "dell_q1_2024");
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.cell(2, 2), &Cell::text("12,000"));
        assert!(sheet.cell(3, 0).is_blank());
        assert!(sheet.cell(0, 1).is_blank());
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let err = WorkbookLoader::new()
            .load_bytes("prices.pdf", b"%PDF", None)
            .unwrap_err();
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_corrupt_excel_reports_context() {
        let err = WorkbookLoader::new()
            .load_bytes("broken.xlsx", b"not a zip", None)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open Excel workbook"));
    }
}
