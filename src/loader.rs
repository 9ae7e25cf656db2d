//! Sheet loading: header detection below the export preamble, synthetic row
//! IDs and the positional tag matrix.

use std::io::{Read, Seek};

use log::{info, warn};

use crate::columns;
use crate::error::{PipelineError, Result};
use crate::office::{Grid, Workbook};
use crate::table::{Column, Table, Value, unique_name};

/// Rows of report preamble above the header in monitoring exports.
pub const PREAMBLE_ROWS: usize = 4;
pub const PRIMARY_SHEET: &str = "Ocorrências";
pub const TAG_SHEET: &str = "Tags";

/// Marker the export writes into a tag cell when the tag applies.
const TAG_MARKER: &str = "SIM";

/// Which sheet is being loaded decides how a missing sheet is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetRole {
    /// Occurrence rows; gets the synthetic `ID` column, missing is fatal.
    Primary,
    /// Optional tag sheet; missing or malformed maps to
    /// [`PipelineError::OptionalSheetMissing`].
    Tags,
}

/// Reads one sheet into a table. Headers are taken from the first row after
/// `preamble_rows`; quotes are stripped and whitespace trimmed.
pub fn load_sheet<R: Read + Seek>(
    workbook: &mut Workbook<R>,
    sheet: &str,
    role: SheetRole,
    preamble_rows: usize,
) -> Result<Table> {
    let loaded = workbook
        .read_sheet(sheet)
        .and_then(|grid| grid_to_table(grid, sheet, preamble_rows));
    match (loaded, role) {
        (Ok(mut table), SheetRole::Primary) => {
            if table.contains(columns::ID) {
                let kept = unique_name(columns::ID, |n| table.contains(n));
                warn!("Sheet '{sheet}' already has an '{}' column; kept as '{kept}'", columns::ID);
                table.rename_column(columns::ID, &kept);
            }
            let ids = (1..=table.height()).map(|i| Value::Number(i as f64)).collect();
            table.insert_column(0, columns::ID, ids);
            Ok(table)
        }
        (Ok(table), SheetRole::Tags) => Ok(table),
        (Err(e), SheetRole::Primary) => Err(e),
        (Err(e), SheetRole::Tags) => Err(PipelineError::OptionalSheetMissing {
            sheet: sheet.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Converts the raw tag sheet into 0/1 columns exactly `height` rows tall.
///
/// Row *i* of the tag sheet belongs to row *i* of the occurrence sheet; extra
/// tag rows are cut, missing ones are zero-filled.
pub fn tag_matrix(raw: &Table, height: usize) -> Table {
    let mut matrix = Table::new(height);
    for column in raw.columns() {
        let values = (0..height)
            .map(|i| {
                let flagged = column
                    .values
                    .get(i)
                    .map(|v| v.render().trim().to_uppercase() == TAG_MARKER)
                    .unwrap_or(false);
                Value::Number(if flagged { 1.0 } else { 0.0 })
            })
            .collect();
        matrix.set_column(&column.name, values);
    }
    matrix
}

/// A zero matrix for the named tags, used when the tag sheet is unavailable.
pub fn empty_tag_matrix<'a>(tags: impl IntoIterator<Item = &'a str>, height: usize) -> Table {
    let mut matrix = Table::new(height);
    for tag in tags {
        if !matrix.contains(tag) {
            matrix.set_column(tag, vec![Value::Number(0.0); height]);
        }
    }
    matrix
}

/// Loads the occurrence sheet and, when present, appends the tag matrix
/// after its last column. Returns the table and whether tags were loaded.
pub fn load_records<R: Read + Seek>(
    workbook: &mut Workbook<R>,
    primary_sheet: &str,
    tag_sheet: &str,
    preamble_rows: usize,
) -> Result<(Table, bool)> {
    let mut table = load_sheet(workbook, primary_sheet, SheetRole::Primary, preamble_rows)?;
    info!(
        "Loaded {} rows x {} columns from '{}'",
        table.height(),
        table.width(),
        primary_sheet
    );

    match load_sheet(workbook, tag_sheet, SheetRole::Tags, preamble_rows) {
        Ok(raw) => {
            let matrix = tag_matrix(&raw, table.height());
            info!(
                "Tag sheet '{}': {} tags aligned by row position ({} tag rows)",
                tag_sheet,
                matrix.width(),
                raw.height()
            );
            table.append_columns(matrix);
            Ok((table, true))
        }
        Err(PipelineError::OptionalSheetMissing { sheet, reason }) => {
            warn!("Tag sheet '{sheet}' not used: {reason}");
            Ok((table, false))
        }
        Err(e) => Err(e),
    }
}

fn grid_to_table(mut grid: Grid, sheet: &str, preamble_rows: usize) -> Result<Table> {
    while grid
        .last()
        .is_some_and(|row| row.iter().all(Value::is_null))
    {
        grid.pop();
    }
    if grid.len() <= preamble_rows {
        return Err(PipelineError::MissingHeader {
            sheet: sheet.to_string(),
            preamble_rows,
        });
    }

    let mut rows = grid.split_off(preamble_rows);
    let header_row = rows.remove(0);
    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_row.len()))
        .max()
        .unwrap_or(0);

    let mut names: Vec<String> = Vec::with_capacity(width);
    for i in 0..width {
        let raw = header_row.get(i).map(Value::render).unwrap_or_default();
        let cleaned = raw.replace('"', "").trim().to_string();
        let base = if cleaned.is_empty() {
            format!("Unnamed: {i}")
        } else {
            cleaned
        };
        let name = unique_name(&base, |n| names.iter().any(|taken| taken == n));
        names.push(name);
    }

    let height = rows.len();
    let mut columns: Vec<Column> = names
        .into_iter()
        .map(|name| Column::new(name, Vec::with_capacity(height)))
        .collect();
    for row in rows {
        for (i, column) in columns.iter_mut().enumerate() {
            column.values.push(row.get(i).cloned().unwrap_or(Value::Null));
        }
    }

    let mut table = Table::new(height);
    for column in columns {
        table.set_column(&column.name.clone(), column.values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| {
                r.iter()
                    .map(|c| if c.is_empty() { Value::Null } else { Value::text(*c) })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn header_follows_preamble_and_is_cleaned() {
        let g = grid(&[
            &["Report"],
            &[],
            &["generated"],
            &[],
            &["\"Descrição\"", " Serviço ", ""],
            &["a", "Twitter", "x"],
            &["b", "Facebook"],
            &[],
        ]);
        let t = grid_to_table(g, "Ocorrências", PREAMBLE_ROWS).unwrap();
        assert_eq!(
            t.column_names().collect::<Vec<_>>(),
            ["Descrição", "Serviço", "Unnamed: 2"]
        );
        assert_eq!(t.height(), 2);
        assert!(t.cell(1, "Unnamed: 2").is_null());
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let g = grid(&[&["A", "A", "A"], &["1", "2", "3"]]);
        let t = grid_to_table(g, "s", 0).unwrap();
        assert_eq!(t.column_names().collect::<Vec<_>>(), ["A", "A.1", "A.2"]);
    }

    #[test]
    fn sheet_without_header_is_rejected() {
        let g = grid(&[&["x"], &[]]);
        match grid_to_table(g, "Ocorrências", PREAMBLE_ROWS) {
            Err(PipelineError::MissingHeader { sheet, .. }) => assert_eq!(sheet, "Ocorrências"),
            other => panic!("unexpected: {:?}", other.map(|t| t.height())),
        }
    }

    #[test]
    fn tag_matrix_is_positional_and_zero_filled() {
        let raw = Table::from_columns(vec![
            Column::new("Saúde", vec![Value::text(" sim "), Value::text("NÃO")]),
            Column::new("Educação", vec![Value::Null, Value::text("SIM")]),
        ]);
        let m = tag_matrix(&raw, 3);
        assert_eq!(m.height(), 3);
        let saude: Vec<f64> = m.column("Saúde").unwrap().iter().map(|v| v.to_number_or_zero()).collect();
        let educ: Vec<f64> = m.column("Educação").unwrap().iter().map(|v| v.to_number_or_zero()).collect();
        assert_eq!(saude, [1.0, 0.0, 0.0]);
        assert_eq!(educ, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn tag_matrix_truncates_longer_sheets() {
        let raw = Table::from_columns(vec![Column::new(
            "T",
            vec![Value::text("SIM"), Value::text("SIM"), Value::text("SIM")],
        )]);
        assert_eq!(tag_matrix(&raw, 1).height(), 1);
    }

    #[test]
    fn empty_matrix_has_requested_tags() {
        let m = empty_tag_matrix(["a", "b", "a"], 2);
        assert_eq!(m.column_names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(m.cell(1, "b"), &Value::Number(0.0));
    }
}
