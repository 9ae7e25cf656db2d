//! Spreadsheet (.xlsx) access: reading the monitoring export through calamine
//! and writing the cleaned workbook through rust_xlsxwriter.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use calamine::{Data, DataType, Reader, Xlsx};

use crate::error::{PipelineError, Result};
use crate::table::{Table, Value};

/// Cells of one worksheet, row-major from A1, ragged (trailing empty cells
/// omitted).
pub type Grid = Vec<Vec<Value>>;

/// Text layout date-typed cells are rendered in; the temporal stage parses
/// exactly this shape.
pub const DATE_CELL_FORMAT: &str = "%d/%m/%y %H:%M";

/// Longest text a worksheet cell can hold.
const MAX_CELL_CHARS: usize = 32_767;

/// An opened .xlsx package.
pub struct Workbook<R> {
    inner: Xlsx<R>,
}

impl Workbook<BufReader<File>> {
    pub fn open(p: &Path) -> Result<Self> {
        let file = File::open(p)
            .map_err(|e| PipelineError::Workbook(format!("Open .xlsx failed: {e}")))?;
        Workbook::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Workbook<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let inner: Xlsx<R> = Xlsx::new(reader)
            .map_err(|e| PipelineError::Workbook(format!("Open .xlsx package failed: {e}")))?;
        Ok(Workbook { inner })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    /// Reads a worksheet by name. Rows and columns keep their sheet position,
    /// so leading blank rows survive as empty rows.
    pub fn read_sheet(&mut self, name: &str) -> Result<Grid> {
        if !self.inner.sheet_names().iter().any(|s| s == name) {
            return Err(PipelineError::SheetNotFound(name.to_string()));
        }
        let range = self
            .inner
            .worksheet_range(name)
            .map_err(|e| PipelineError::Workbook(format!("Read sheet '{name}' failed: {e}")))?;

        let (first_row, first_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut grid: Grid = vec![Vec::new(); first_row];
        for cells in range.rows() {
            let mut row: Vec<Value> = vec![Value::Null; first_col];
            row.extend(cells.iter().map(cell_value));
            while row.last().is_some_and(Value::is_null) {
                row.pop();
            }
            grid.push(row);
        }
        Ok(grid)
    }
}

/// Converts one calamine cell. Errors, blanks and empty strings become null,
/// booleans the spreadsheet's `TRUE`/`FALSE`, dates the `dd/mm/yy hh:mm`
/// export text.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) if dt.is_duration() => Value::Number(dt.as_f64()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(ts) => Value::text(ts.format(DATE_CELL_FORMAT).to_string()),
            None => Value::text(cell.to_string()),
        },
        Data::DurationIso(s) => Value::text(s.as_str()),
    }
}

/// Serialises named tables into an .xlsx package, one worksheet each, header
/// in the first row.
pub fn write_workbook(sheets: &[(&str, &Table)]) -> Result<Vec<u8>> {
    let mut workbook = rust_xlsxwriter::Workbook::new();

    for (name, table) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_title(name)).map_err(write_error)?;

        for (col, header) in table.column_names().enumerate() {
            sheet
                .write_string(0, column_number(col)?, cell_text(header))
                .map_err(write_error)?;
        }
        for i in 0..table.height() {
            let row = row_number(i + 1)?;
            for (col, value) in table.row(i).into_iter().enumerate() {
                let col = column_number(col)?;
                match value {
                    Value::Number(n) if n.is_finite() => {
                        sheet.write_number(row, col, *n).map_err(write_error)?;
                    }
                    Value::Text(s) => {
                        sheet.write_string(row, col, cell_text(s)).map_err(write_error)?;
                    }
                    Value::Null | Value::Number(_) => {}
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(write_error)
}

fn write_error(e: rust_xlsxwriter::XlsxError) -> PipelineError {
    PipelineError::Workbook(format!("Write .xlsx failed: {e}"))
}

fn row_number(index: usize) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| PipelineError::Workbook(format!("Row {index} does not fit in a worksheet")))
}

fn column_number(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| PipelineError::Workbook(format!("Column {index} does not fit in a worksheet")))
}

/// Cell text capped at the worksheet limit.
fn cell_text(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        s.to_string()
    } else {
        s.chars().take(MAX_CELL_CHARS).collect()
    }
}

/// Worksheet titles are capped at 31 characters and may not contain `[]:*?/\`.
fn sheet_title(name: &str) -> String {
    let title: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let title = title.trim_matches('\'').to_string();
    if title.is_empty() {
        "Sheet".to_string()
    } else {
        title
    }
}
