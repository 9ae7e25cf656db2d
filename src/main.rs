#![forbid(unsafe_code)]
//! # Media Digest CLI
//!
//! Command-line interface for the `media_digest` crate. It cleans
//! media-monitoring spreadsheet exports and writes a cleaned workbook, text
//! corpora and, when macrothemes are given, per-theme corpora and summary
//! tables next to each input (or into `--out-dir`).
//!
//! ## Features
//! - Process one `.xlsx` export or every export under a directory.
//! - Publication or news exports (`--mode`).
//! - Up to four macrothemes from `--theme` or a JSON `--themes-file`.
//! - Tables as xlsx, csv, tsv or json.
//!
//! ## Example
//! ```bash
//! cargo run --release -- reports/ --theme "1=Saúde,SUS" --theme "2=Educação" --out-dir out
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage detail. See `--help` for all options.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info};
use media_digest::config::build_theme_set;
use media_digest::{
    ExportFormat, PipelineOptions, SourceMode, collect_files, print_failed_files, process_batch,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Export file (.xlsx) or directory of exports
    path: PathBuf,

    /// Directory for the outputs (default: next to each input)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Kind of export being processed
    #[arg(long, value_enum, default_value_t = SourceMode::Publications)]
    mode: SourceMode,

    /// Macrotheme as ID=tag,tag (repeatable, ids 1 to 4)
    #[arg(long = "theme")]
    themes: Vec<String>,

    /// JSON file mapping macrotheme ids to tag lists, e.g. {"1": ["Saúde"]}
    #[arg(long)]
    themes_file: Option<PathBuf>,

    /// Allow one tag to belong to several macrothemes
    #[arg(long, default_value_t = false)]
    multitheme: bool,

    /// Output format for tables (xlsx, csv, tsv, json)
    #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
    export_format: ExportFormat,

    /// Sheet holding the occurrence rows
    #[arg(long, default_value = media_digest::loader::PRIMARY_SHEET)]
    primary_sheet: String,

    /// Optional sheet holding one SIM/NÃO column per tag
    #[arg(long, default_value = media_digest::loader::TAG_SHEET)]
    tag_sheet: String,

    /// Report rows above the header row
    #[arg(long, default_value_t = media_digest::loader::PREAMBLE_ROWS)]
    preamble_rows: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let themes = match build_theme_set(&cli.themes, cli.themes_file.as_deref(), cli.multitheme) {
        Ok(themes) => themes,
        Err(e) => {
            error!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = PipelineOptions {
        mode: cli.mode,
        themes,
        primary_sheet: cli.primary_sheet,
        tag_sheet: cli.tag_sheet,
        preamble_rows: cli.preamble_rows,
        export_format: cli.export_format,
    };

    let files = collect_files(Path::new(&cli.path));
    if files.is_empty() {
        error!("No .xlsx files found at {}", cli.path.display());
        process::exit(1);
    }

    let report = process_batch(&cli.path, &files, cli.out_dir.as_deref(), &opts);
    info!(
        "Processed {} of {} files, {} outputs written",
        files.len() - report.failed_files.len(),
        files.len(),
        report.written.len()
    );
    if !report.failed_files.is_empty() {
        print_failed_files(&report.failed_files);
        process::exit(1);
    }
}
