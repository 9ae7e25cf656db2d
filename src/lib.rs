//! Cleaning and thematic summarisation of media-monitoring spreadsheet
//! exports.
//!
//! One run reads an export workbook and produces a cleaned record table, a
//! plain analysis corpus, a tagged linguistic corpus and, when macrothemes are
//! configured, per-theme corpora plus summary tables:
//!
//! ```text
//! SheetLoader → ColumnNormalizer → GroupDecomposer → TemporalEnricher
//!   → AnalysisComposer → MacrothemeClassifier → CorpusExporter
//! ```
//!
//! Every stage works on an in-memory [`Table`]; nothing touches the output
//! directory until every artifact has been rendered.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

pub mod analysis;
pub mod columns;
pub mod config;
pub mod corpus;
pub mod error;
pub mod export;
pub mod groups;
pub mod loader;
pub mod macrotheme;
pub mod normalize;
pub mod office;
pub mod table;
pub mod temporal;

pub use config::SourceMode;
pub use corpus::ThemeCorpus;
pub use error::{PipelineError, Result};
pub use export::{Artifact, ExportFormat, csv_safe_cell};
pub use macrotheme::{Classification, Macrotheme, ThemeSet};
pub use office::Workbook;
pub use table::{Column, Table, Value};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: SourceMode,
    /// Macrotheme definitions; `None` skips classification.
    pub themes: Option<ThemeSet>,
    pub primary_sheet: String,
    pub tag_sheet: String,
    pub preamble_rows: usize,
    pub export_format: ExportFormat,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            mode: SourceMode::Publications,
            themes: None,
            primary_sheet: loader::PRIMARY_SHEET.to_string(),
            tag_sheet: loader::TAG_SHEET.to_string(),
            preamble_rows: loader::PREAMBLE_ROWS,
            export_format: ExportFormat::Xlsx,
        }
    }
}

/// Everything one run produced, still in memory.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: Table,
    /// Whether the tag sheet was found and aligned.
    pub tags_loaded: bool,
    pub classification: Option<Classification>,
    pub analysis_corpus: String,
    pub linguistic_corpus: String,
    pub theme_corpora: Vec<ThemeCorpus>,
}

impl PipelineOutput {
    /// Renders all output files for an input named `<base>.xlsx`.
    pub fn artifacts(&self, base: &str, format: ExportFormat) -> Result<Vec<Artifact>> {
        let summaries = self
            .classification
            .as_ref()
            .map(Classification::summary_tables)
            .unwrap_or_default();
        let mut tables: Vec<(&str, &Table)> = vec![("cleaned", &self.table)];
        tables.extend(summaries.iter().map(|(name, table)| (*name, table)));

        let mut artifacts = export::table_artifacts(base, &tables, format)?;
        artifacts.push(Artifact::text(
            format!("{base}_cleaned.txt"),
            &self.analysis_corpus,
        ));
        artifacts.push(Artifact::text(
            format!("{base}_corpus.txt"),
            &self.linguistic_corpus,
        ));
        for corpus in &self.theme_corpora {
            artifacts.push(Artifact::text(
                format!("{base}_ai_{}.txt", corpus.file_stem()),
                &corpus.text,
            ));
        }
        Ok(artifacts)
    }
}

/// Runs every stage on an opened workbook.
pub fn run_pipeline<R: Read + Seek>(
    workbook: &mut Workbook<R>,
    opts: &PipelineOptions,
) -> Result<PipelineOutput> {
    let (mut table, tags_loaded) = loader::load_records(
        workbook,
        &opts.primary_sheet,
        &opts.tag_sheet,
        opts.preamble_rows,
    )?;

    if let Some(themes) = &opts.themes {
        if !tags_loaded {
            warn!("No tag sheet; every macrotheme will be empty");
            table.append_columns(loader::empty_tag_matrix(themes.tags(), table.height()));
        }
    }

    normalize::normalize_columns(&mut table, opts.mode);
    if opts.mode == SourceMode::Publications {
        groups::decompose_groups(&mut table);
        temporal::enrich_temporal(&mut table);
    }
    analysis::compose_analysis(&mut table, opts.mode);

    let (classification, theme_corpora) = match &opts.themes {
        Some(themes) => {
            let classification = macrotheme::classify(&mut table, themes)?;
            let corpora = corpus::macrotheme_corpora(&table, &classification.assignments, themes);
            (Some(classification), corpora)
        }
        None => (None, Vec::new()),
    };

    Ok(PipelineOutput {
        analysis_corpus: corpus::analysis_corpus(&table),
        linguistic_corpus: corpus::linguistic_corpus(&table, opts.mode),
        table,
        tags_loaded,
        classification,
        theme_corpora,
    })
}

/// Opens `path` and runs the pipeline on it.
pub fn process_workbook(path: &Path, opts: &PipelineOptions) -> Result<PipelineOutput> {
    info!("Processing {}", path.display());
    let mut workbook = Workbook::open(path)?;
    run_pipeline(&mut workbook, opts)
}

/// Processes one file and writes its artifacts into `out_dir` (default: the
/// input's directory). Returns the written paths.
pub fn process_path(
    path: &Path,
    out_dir: Option<&Path>,
    opts: &PipelineOptions,
) -> Result<Vec<PathBuf>> {
    let output = process_workbook(path, opts)?;
    let out_dir = output_dir_for(path, None, out_dir);
    let artifacts = output.artifacts(&base_name(path), opts.export_format)?;
    export::commit(&out_dir, &artifacts)
}

/// Output file prefix for an input: its file stem.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string())
}

/// Directory the outputs of `file` go to. Without `out_dir` that is the
/// file's own directory; with it, the file's subdirectory below `root` is
/// rebuilt under `out_dir` so same-named inputs stay apart.
pub fn output_dir_for(file: &Path, root: Option<&Path>, out_dir: Option<&Path>) -> PathBuf {
    let parent = file.parent().unwrap_or(Path::new(""));
    let dir = match out_dir {
        Some(out) => match root.and_then(|r| parent.strip_prefix(r).ok()) {
            Some(relative) if !relative.as_os_str().is_empty() => out.join(relative),
            _ => out.to_path_buf(),
        },
        None => parent.to_path_buf(),
    };
    if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir
    }
}

/// Result of a batch run: what was written and which files failed.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed_files: Vec<(String, String)>,
}

/// `.xlsx` inputs under `path`, sorted. A file path is returned as is; inside
/// a directory, earlier outputs (`*_cleaned.xlsx`) and Excel lock files are
/// skipped.
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| x.eq_ignore_ascii_case("xlsx"))
        })
        .filter(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| !s.ends_with("_cleaned") && !s.starts_with("~$"))
        })
        .collect();
    files.sort();
    files
}

/// Processes independent files in parallel. A failing file never stops the
/// others. `root` is the directory the files were collected from.
///
/// Files whose outputs would land on the names another file already claims
/// fail up front; the first file in `files` keeps the names.
pub fn process_batch(
    root: &Path,
    files: &[PathBuf],
    out_dir: Option<&Path>,
    opts: &PipelineOptions,
) -> BatchReport {
    let mut claimed: HashMap<(PathBuf, String), &PathBuf> = HashMap::new();
    let jobs: Vec<(&PathBuf, Result<PathBuf>)> = files
        .iter()
        .map(|file| {
            let dir = output_dir_for(file, Some(root), out_dir);
            match claimed.entry((dir.clone(), base_name(file))) {
                Entry::Occupied(first) => (
                    file,
                    Err(PipelineError::OutputCollision {
                        file: file.display().to_string(),
                        other: first.get().display().to_string(),
                    }),
                ),
                Entry::Vacant(slot) => {
                    slot.insert(file);
                    (file, Ok(dir))
                }
            }
        })
        .collect();

    let results: Vec<(&PathBuf, Result<Vec<PathBuf>>)> = jobs
        .into_par_iter()
        .map(|(file, dir)| {
            let written = dir.and_then(|dir| process_path(file, Some(&dir), opts));
            (file, written)
        })
        .collect();

    let mut report = BatchReport::default();
    for (file, result) in results {
        match result {
            Ok(paths) => report.written.extend(paths),
            Err(e) => {
                error!("Failed to process {}: {e}", file.display());
                report
                    .failed_files
                    .push((file.display().to_string(), e.to_string()));
            }
        }
    }
    report
}

/// Prints the files that could not be processed to stderr.
pub fn print_failed_files(failed: &[(String, String)]) {
    eprintln!("Failed files ({}):", failed.len());
    for (file, reason) in failed {
        eprintln!("  {file}: {reason}");
    }
}
