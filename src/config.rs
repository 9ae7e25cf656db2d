//! Run configuration: source mode and macrotheme definitions from the
//! command line or a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use clap::ValueEnum;

use crate::error::{PipelineError, Result};
use crate::macrotheme::{Macrotheme, ThemeSet};

/// Kind of monitoring export being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceMode {
    /// Social media publications: engagement, groups and dates are processed.
    #[default]
    Publications,
    /// News items: titles instead of publishers, no engagement.
    News,
}

/// Parses one `--theme` argument of the form `ID=tag,tag`.
///
/// ```
/// use media_digest::config::parse_theme_arg;
/// let t = parse_theme_arg("2=Saúde, SUS").unwrap();
/// assert_eq!(t.id, 2);
/// assert_eq!(t.tags, ["Saúde", "SUS"]);
/// ```
pub fn parse_theme_arg(arg: &str) -> Result<Macrotheme> {
    let (id, tags) = arg.split_once('=').ok_or_else(|| {
        PipelineError::Configuration(format!("theme '{arg}' must look like ID=tag,tag"))
    })?;
    let id: u8 = id.trim().parse().map_err(|_| {
        PipelineError::Configuration(format!("theme id '{}' is not a number", id.trim()))
    })?;
    let tags: Vec<String> = tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Macrotheme { id, tags })
}

/// Parses a theme file: a JSON object mapping ids to tag arrays, e.g.
/// `{"1": ["Saúde"], "2": ["Educação", "Cultura"]}`.
pub fn parse_theme_json(json: &str) -> Result<Vec<Macrotheme>> {
    let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(id, tags)| {
            let id: u8 = id.trim().parse().map_err(|_| {
                PipelineError::Configuration(format!("theme id '{id}' is not a number"))
            })?;
            Ok(Macrotheme { id, tags })
        })
        .collect()
}

pub fn load_theme_file(path: &Path) -> Result<Vec<Macrotheme>> {
    let json = fs::read_to_string(path)?;
    parse_theme_json(&json)
}

/// Combines `--theme` arguments and an optional theme file into a validated
/// set. Returns `None` when no theme was given.
pub fn build_theme_set(
    args: &[String],
    file: Option<&Path>,
    allow_overlap: bool,
) -> Result<Option<ThemeSet>> {
    let mut themes = match file {
        Some(path) => load_theme_file(path)?,
        None => Vec::new(),
    };
    for arg in args {
        themes.push(parse_theme_arg(arg)?);
    }
    if themes.is_empty() {
        return Ok(None);
    }
    ThemeSet::new(themes, allow_overlap).map(Some)
}
