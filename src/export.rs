//! Rendering of tables and corpora to bytes, and the staged write that puts
//! a run's files in place only once all of them rendered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use csv::WriterBuilder;
use log::{debug, info};
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::office::write_workbook;
use crate::table::{Table, Value};

/// Supported export formats for tabular output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// One workbook with one sheet per table
    #[default]
    Xlsx,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// A file ready to be written: name inside the output directory and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn text(file_name: impl Into<String>, text: &str) -> Self {
        Artifact {
            file_name: file_name.into(),
            bytes: text.as_bytes().to_vec(),
        }
    }
}

/// Prevent CSV/TSV formula injection by prefixing a single quote when a cell
/// starts with one of `=`, `+`, `-`, `@`. A cell that already starts with a
/// quote is left alone.
pub fn csv_safe_cell(mut s: String) -> String {
    if s.starts_with(['=', '+', '-', '@']) {
        s.insert(0, '\'');
    }
    s
}

/// Renders named tables in `format`.
///
/// Xlsx yields a single `<base>_cleaned.xlsx` holding every table as a sheet;
/// the first table's sheet is titled `Cleaned Data`. The delimited formats and
/// JSON yield one `<base>_<name>.<ext>` file per table.
pub fn table_artifacts(
    base: &str,
    tables: &[(&str, &Table)],
    format: ExportFormat,
) -> Result<Vec<Artifact>> {
    match format {
        ExportFormat::Xlsx => {
            let sheets: Vec<(&str, &Table)> = tables
                .iter()
                .enumerate()
                .map(|(i, (name, table))| (if i == 0 { "Cleaned Data" } else { *name }, *table))
                .collect();
            Ok(vec![Artifact {
                file_name: format!("{base}_cleaned.xlsx"),
                bytes: write_workbook(&sheets)?,
            }])
        }
        ExportFormat::Csv | ExportFormat::Tsv | ExportFormat::Json => tables
            .iter()
            .map(|(name, table)| {
                let bytes = match format {
                    ExportFormat::Json => render_json(table)?,
                    ExportFormat::Tsv => render_delimited(table, b'\t')?,
                    _ => render_delimited(table, b',')?,
                };
                Ok(Artifact {
                    file_name: format!("{base}_{name}.{}", format.extension()),
                    bytes,
                })
            })
            .collect(),
    }
}

/// Header plus one record per row. Text cells are neutralised against
/// formula injection; numbers are written as-is.
pub fn render_delimited(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    wtr.write_record(table.column_names().map(|n| csv_safe_cell(n.to_string())))?;
    for i in 0..table.height() {
        wtr.write_record(table.row(i).into_iter().map(|v| match v {
            Value::Text(s) => csv_safe_cell(s.clone()),
            other => other.render(),
        }))?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| PipelineError::Io(io::Error::other(e.to_string())))
}

#[derive(Serialize)]
struct JsonTable<'a> {
    columns: Vec<&'a str>,
    rows: Vec<Vec<&'a Value>>,
}

/// `{"columns": [...], "rows": [[...], ...]}` keeping column order.
pub fn render_json(table: &Table) -> Result<Vec<u8>> {
    let doc = JsonTable {
        columns: table.column_names().collect(),
        rows: (0..table.height()).map(|i| table.row(i)).collect(),
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

/// Writes every artifact into `out_dir` or none of them.
///
/// Files go to a fresh temporary directory inside `out_dir` first and are
/// renamed into place once all writes succeeded; the staging directory is
/// removed on drop either way.
pub fn commit(out_dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".media_digest-")
        .tempdir_in(out_dir)?;

    for artifact in artifacts {
        let staged = staging.path().join(&artifact.file_name);
        fs::write(&staged, &artifact.bytes)?;
        debug!("Staged {}", staged.display());
    }

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let target = out_dir.join(&artifact.file_name);
        fs::rename(staging.path().join(&artifact.file_name), &target)?;
        info!("Wrote {}", target.display());
        written.push(target);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(1.0), Value::Number(2.0)]),
            Column::new("Descrição", vec![Value::text("=SUM(A1)"), Value::Null]),
            Column::new("Manifestações reais", vec![Value::Number(-3.0), Value::Number(2.5)]),
        ])
    }

    #[test]
    fn csv_cells_are_neutralised_but_numbers_are_not() {
        let out = String::from_utf8(render_delimited(&sample(), b',').unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID,Descrição,Manifestações reais");
        assert_eq!(lines[1], "1,'=SUM(A1),-3");
        assert_eq!(lines[2], "2,,2.5");
    }

    #[test]
    fn json_keeps_column_order() {
        let bytes = render_json(&sample()).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["columns"][1], "Descrição");
        assert_eq!(v["rows"][0][0], 1.0);
        assert!(v["rows"][1][1].is_null());
    }

    #[test]
    fn xlsx_is_one_file_delimited_is_one_per_table() {
        let t = sample();
        let tables = [("cleaned", &t), ("macro_freq", &t)];
        let xlsx = table_artifacts("report", &tables, ExportFormat::Xlsx).unwrap();
        assert_eq!(xlsx.len(), 1);
        assert_eq!(xlsx[0].file_name, "report_cleaned.xlsx");

        let tsv = table_artifacts("report", &tables, ExportFormat::Tsv).unwrap();
        let names: Vec<&str> = tsv.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["report_cleaned.tsv", "report_macro_freq.tsv"]);
    }

    #[test]
    fn commit_leaves_no_staging_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = commit(
            &out,
            &[Artifact::text("a.txt", "alpha"), Artifact::text("b.txt", "beta")],
        )
        .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(out.join("b.txt")).unwrap(), "beta");
        let entries: Vec<_> = fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn safe_cell_never_double_prefixes() {
        assert_eq!(csv_safe_cell("'@SAFE".into()), "'@SAFE");
        assert_eq!(csv_safe_cell("+1".into()), "'+1");
        assert_eq!(csv_safe_cell("normal".into()), "normal");
    }
}
