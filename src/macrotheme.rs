//! Macrotheme assignment and the summary tables built on top of it.
//!
//! A macrotheme is a user-named bucket of tag columns. A row belongs to a
//! macrotheme when any of its tags is set; when several match, the theme
//! with the highest id wins because themes are applied in ascending id order
//! and each match overwrites the previous one.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{info, warn};
use serde::Serialize;

use crate::columns;
use crate::error::{PipelineError, Result};
use crate::table::{Column, Table, Value};

pub const MAX_MACROTHEMES: u8 = 4;
/// Label for rows no macrotheme claimed.
pub const UNASSIGNED_LABEL: &str = "No Macrotheme";

/// One macrotheme: id in `1..=MAX_MACROTHEMES` and the tag columns it spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Macrotheme {
    pub id: u8,
    pub tags: Vec<String>,
}

impl Macrotheme {
    pub fn new<S: Into<String>>(id: u8, tags: impl IntoIterator<Item = S>) -> Self {
        Macrotheme {
            id,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Display name: tags joined with `" + "`.
    pub fn display_name(&self) -> String {
        self.tags.join(" + ")
    }
}

/// Validated macrotheme definitions, kept in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThemeSet {
    themes: Vec<Macrotheme>,
}

impl ThemeSet {
    /// Checks ids, emptiness and, unless `allow_overlap`, that no tag sits in
    /// two themes.
    pub fn new(mut themes: Vec<Macrotheme>, allow_overlap: bool) -> Result<Self> {
        themes.sort_by_key(|t| t.id);
        let mut seen_ids = BTreeSet::new();
        let mut owner: HashMap<&str, u8> = HashMap::new();

        for theme in &themes {
            if theme.id == 0 || theme.id > MAX_MACROTHEMES {
                return Err(PipelineError::Configuration(format!(
                    "macrotheme id {} is outside 1..={MAX_MACROTHEMES}",
                    theme.id
                )));
            }
            if !seen_ids.insert(theme.id) {
                return Err(PipelineError::Configuration(format!(
                    "macrotheme {} is defined twice",
                    theme.id
                )));
            }
            if theme.tags.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "macrotheme {} has no tags",
                    theme.id
                )));
            }
            if !allow_overlap {
                for tag in &theme.tags {
                    if let Some(other) = owner.insert(tag.as_str(), theme.id) {
                        if other != theme.id {
                            return Err(PipelineError::Configuration(format!(
                                "tag '{tag}' is used by macrothemes {other} and {}; enable multitheme to allow this",
                                theme.id
                            )));
                        }
                    }
                }
            }
        }
        Ok(ThemeSet { themes })
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macrotheme> {
        self.themes.iter()
    }

    pub fn get(&self, id: u8) -> Option<&Macrotheme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Every tag named by any theme, first occurrence order.
    pub fn tags(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for tag in self.themes.iter().flat_map(|t| t.tags.iter()) {
            if !out.contains(&tag.as_str()) {
                out.push(tag);
            }
        }
        out
    }

    /// Display name for an assignment; 0 and unknown ids are unassigned.
    pub fn label(&self, id: u8) -> String {
        self.get(id)
            .map(Macrotheme::display_name)
            .unwrap_or_else(|| UNASSIGNED_LABEL.to_string())
    }
}

/// Fails on the first tag column a theme names that the table lacks.
pub fn validate_themes(table: &Table, themes: &ThemeSet) -> Result<()> {
    for theme in themes.iter() {
        if let Some(missing) = theme.tags.iter().find(|t| !table.contains(t)) {
            return Err(PipelineError::UnknownTagColumn {
                theme: theme.id,
                column: missing.clone(),
            });
        }
    }
    Ok(())
}

/// Macrotheme id per row, 0 when no theme matched.
pub fn assign_macrothemes(table: &Table, themes: &ThemeSet) -> Result<Vec<u8>> {
    validate_themes(table, themes)?;
    let mut assignments = vec![0u8; table.height()];

    for theme in themes.iter() {
        let tag_columns: Vec<&[Value]> = theme
            .tags
            .iter()
            .filter_map(|t| table.column(t))
            .collect();
        for (i, slot) in assignments.iter_mut().enumerate() {
            let signal: f64 = tag_columns
                .iter()
                .map(|values| values[i].to_number_or_zero())
                .sum();
            if signal > 0.0 {
                *slot = theme.id;
            }
        }
    }
    Ok(assignments)
}

/// One row of the daily pivot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub macrotheme: String,
    pub total_publications: usize,
    pub total_engagement: f64,
}

/// Publications and real engagement per (year, month, day, macrotheme).
///
/// Rows without a parsed date are left out. Ordering is by month then day
/// only; rows sharing a month/day keep (year, macrotheme) order, so several
/// years interleave.
pub fn daily_pivot(table: &Table, assignments: &[u8], themes: &ThemeSet) -> Vec<PivotRow> {
    let date_columns = [columns::YEAR, columns::MONTH, columns::DAY];
    if !date_columns.iter().all(|c| table.contains(c)) {
        warn!("Date columns missing; daily pivot is empty");
        return Vec::new();
    }

    let mut groups: BTreeMap<(i32, u32, u32, String), (usize, f64)> = BTreeMap::new();
    for (i, id) in assignments.iter().enumerate() {
        let (Some(year), Some(month), Some(day)) = (
            table.cell(i, columns::YEAR).as_number(),
            table.cell(i, columns::MONTH).as_number(),
            table.cell(i, columns::DAY).as_number(),
        ) else {
            continue;
        };
        let engagement = table.cell(i, columns::REAL_ENGAGEMENT).to_number_or_zero();
        let entry = groups
            .entry((year as i32, month as u32, day as u32, themes.label(*id)))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += engagement;
    }

    let mut rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|((year, month, day, macrotheme), (count, engagement))| PivotRow {
            year,
            month,
            day,
            macrotheme,
            total_publications: count,
            total_engagement: engagement,
        })
        .collect();
    rows.sort_by_key(|r| (r.month, r.day));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroFrequency {
    pub macrotheme: String,
    pub relative_frequency: f64,
}

/// Share of rows per macrotheme label in percent, 2 decimals, most frequent
/// first.
pub fn macro_frequencies(assignments: &[u8], themes: &ThemeSet) -> Vec<MacroFrequency> {
    let total = assignments.len();
    if total == 0 {
        return Vec::new();
    }
    let mut counts: Vec<(String, usize)> = Vec::new();
    for id in assignments {
        let label = themes.label(*id);
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(macrotheme, n)| MacroFrequency {
            macrotheme,
            relative_frequency: round_to(n as f64 * 100.0 / total as f64, 2),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroFrequency {
    pub microtheme: String,
    pub relative_frequency: f64,
}

/// Columns after `Serviço` whose non-null values are all numeric 0 or 1.
/// All-null columns and the classifier's own output column are never
/// microthemes.
pub fn microtheme_columns(table: &Table) -> Result<Vec<&Column>> {
    let service = table
        .position(columns::SERVICE)
        .ok_or_else(|| PipelineError::MissingColumn(columns::SERVICE.to_string()))?;
    Ok(table.columns()[service + 1..]
        .iter()
        .filter(|c| c.name != columns::MACROTHEME && !c.is_all_null())
        .filter(|c| {
            c.values
                .iter()
                .filter(|v| !v.is_null())
                .all(|v| matches!(v.as_number(), Some(n) if n == 0.0 || n == 1.0))
        })
        .collect())
}

/// Fraction of all rows carrying each microtheme, 4 decimals.
pub fn micro_frequencies(table: &Table) -> Result<Vec<MicroFrequency>> {
    let total = table.height();
    Ok(microtheme_columns(table)?
        .into_iter()
        .map(|c| {
            let hits: f64 = c.values.iter().map(Value::to_number_or_zero).sum();
            let share = if total == 0 { 0.0 } else { hits / total as f64 };
            MicroFrequency {
                microtheme: c.name.clone(),
                relative_frequency: round_to(share, 4),
            }
        })
        .collect())
}

/// Microtheme shares (percent, 2 decimals) inside one macrotheme's rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroShare {
    pub macrotheme: String,
    pub shares: Vec<(String, f64)>,
}

/// Mean of every microtheme column per assigned macrotheme, in id order.
pub fn micro_shares_by_macro(
    table: &Table,
    assignments: &[u8],
    themes: &ThemeSet,
) -> Result<Vec<MicroShare>> {
    let micro = microtheme_columns(table)?;
    let ids: BTreeSet<u8> = assignments.iter().copied().collect();

    Ok(ids
        .into_iter()
        .map(|id| {
            let rows: Vec<usize> = assignments
                .iter()
                .enumerate()
                .filter(|(_, a)| **a == id)
                .map(|(i, _)| i)
                .collect();
            let shares = micro
                .iter()
                .map(|c| {
                    let hits: f64 = rows.iter().map(|&i| c.values[i].to_number_or_zero()).sum();
                    (c.name.clone(), round_to(hits * 100.0 / rows.len() as f64, 2))
                })
                .collect();
            MicroShare {
                macrotheme: themes.label(id),
                shares,
            }
        })
        .collect())
}

/// Everything the classifier produces for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub assignments: Vec<u8>,
    pub pivot: Vec<PivotRow>,
    pub macro_frequencies: Vec<MacroFrequency>,
    pub micro_frequencies: Vec<MicroFrequency>,
    pub micro_shares: Vec<MicroShare>,
}

/// Assigns macrothemes, records them in the `Macrotema` column and builds
/// the summaries.
pub fn classify(table: &mut Table, themes: &ThemeSet) -> Result<Classification> {
    let assignments = assign_macrothemes(table, themes)?;
    let assigned = assignments.iter().filter(|a| **a != 0).count();
    info!(
        "Macrothemes assigned to {assigned} of {} rows",
        assignments.len()
    );

    let micro_frequencies = micro_frequencies(table)?;
    let micro_shares = micro_shares_by_macro(table, &assignments, themes)?;
    let pivot = daily_pivot(table, &assignments, themes);
    let macro_frequencies = macro_frequencies(&assignments, themes);

    table.set_column(
        columns::MACROTHEME,
        assignments.iter().map(|a| Value::Number(*a as f64)).collect(),
    );

    Ok(Classification {
        assignments,
        pivot,
        macro_frequencies,
        micro_frequencies,
        micro_shares,
    })
}

impl Classification {
    /// Summary tables keyed by their worksheet name.
    pub fn summary_tables(&self) -> Vec<(&'static str, Table)> {
        vec![
            ("pvt_summary", self.pivot_table()),
            ("macro_freq", self.macro_table()),
            ("microtheme_freq", self.micro_table()),
            ("microtheme_by_macro", self.micro_share_table()),
        ]
    }

    pub fn pivot_table(&self) -> Table {
        let p = &self.pivot;
        Table::from_columns(vec![
            Column::new(columns::YEAR, p.iter().map(|r| Value::Number(r.year as f64)).collect()),
            Column::new(columns::MONTH, p.iter().map(|r| Value::Number(r.month as f64)).collect()),
            Column::new(columns::DAY, p.iter().map(|r| Value::Number(r.day as f64)).collect()),
            Column::new(
                columns::MACROTHEME_NAME,
                p.iter().map(|r| Value::text(r.macrotheme.as_str())).collect(),
            ),
            Column::new(
                "Total_Publicações",
                p.iter().map(|r| Value::Number(r.total_publications as f64)).collect(),
            ),
            Column::new(
                "Total_Engajamento",
                p.iter().map(|r| Value::Number(r.total_engagement)).collect(),
            ),
        ])
    }

    pub fn macro_table(&self) -> Table {
        let m = &self.macro_frequencies;
        Table::from_columns(vec![
            Column::new(
                columns::MACROTHEME,
                m.iter().map(|r| Value::text(r.macrotheme.as_str())).collect(),
            ),
            Column::new(
                "Frequência Relativa (%)",
                m.iter().map(|r| Value::Number(r.relative_frequency)).collect(),
            ),
        ])
    }

    pub fn micro_table(&self) -> Table {
        let m = &self.micro_frequencies;
        Table::from_columns(vec![
            Column::new(
                "Microtema",
                m.iter().map(|r| Value::text(r.microtheme.as_str())).collect(),
            ),
            Column::new(
                "Frequência Relativa",
                m.iter().map(|r| Value::Number(r.relative_frequency)).collect(),
            ),
        ])
    }

    /// One row per macrotheme, one column per microtheme.
    pub fn micro_share_table(&self) -> Table {
        let mut out = Table::new(self.micro_shares.len());
        out.set_column(
            columns::MACROTHEME,
            self.micro_shares
                .iter()
                .map(|s| Value::text(s.macrotheme.as_str()))
                .collect(),
        );
        let names: Vec<String> = self
            .micro_shares
            .first()
            .map(|s| s.shares.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default();
        for (j, name) in names.iter().enumerate() {
            let values = self
                .micro_shares
                .iter()
                .map(|s| Value::Number(s.shares[j].1))
                .collect();
            out.set_column(name, values);
        }
        out
    }
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(values: &[f64]) -> Vec<Value> {
        values.iter().map(|v| Value::Number(*v)).collect()
    }

    fn tagged_table() -> Table {
        Table::from_columns(vec![
            Column::new("ID", num(&[1.0, 2.0, 3.0, 4.0])),
            Column::new("Serviço", vec![Value::text("Twitter"); 4]),
            Column::new("Manifestações reais", num(&[10.0, 5.0, 1.0, 0.0])),
            Column::new("Ano", num(&[2024.0, 2024.0, 2024.0, 2023.0])),
            Column::new("Mês", num(&[2.0, 1.0, 1.0, 12.0])),
            Column::new("Dia", num(&[1.0, 15.0, 15.0, 31.0])),
            Column::new("tagA", num(&[1.0, 1.0, 0.0, 0.0])),
            Column::new("tagB", num(&[1.0, 0.0, 0.0, 0.0])),
            Column::new("tagC", num(&[0.0, 0.0, 1.0, 0.0])),
        ])
    }

    fn themes() -> ThemeSet {
        ThemeSet::new(
            vec![Macrotheme::new(2, ["tagB"]), Macrotheme::new(1, ["tagA"])],
            false,
        )
        .unwrap()
    }

    #[test]
    fn highest_matching_id_wins() {
        let t = tagged_table();
        let a = assign_macrothemes(&t, &themes()).unwrap();
        assert_eq!(a, vec![2, 1, 0, 0]);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let t = tagged_table();
        let set = ThemeSet::new(vec![Macrotheme::new(1, ["tagA", "ghost"])], false).unwrap();
        match assign_macrothemes(&t, &set) {
            Err(PipelineError::UnknownTagColumn { theme, column }) => {
                assert_eq!(theme, 1);
                assert_eq!(column, "ghost");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn theme_set_validation() {
        assert!(ThemeSet::new(vec![Macrotheme::new(5, ["a"])], true).is_err());
        assert!(ThemeSet::new(vec![Macrotheme::new(0, ["a"])], true).is_err());
        assert!(ThemeSet::new(vec![Macrotheme::new(1, Vec::<String>::new())], true).is_err());
        assert!(
            ThemeSet::new(vec![Macrotheme::new(1, ["a"]), Macrotheme::new(1, ["b"])], true)
                .is_err()
        );
        let overlap = vec![Macrotheme::new(1, ["a", "b"]), Macrotheme::new(2, ["b"])];
        assert!(ThemeSet::new(overlap.clone(), false).is_err());
        assert!(ThemeSet::new(overlap, true).is_ok());
    }

    #[test]
    fn labels_join_tags() {
        let set = ThemeSet::new(vec![Macrotheme::new(3, ["Saúde", "SUS"])], false).unwrap();
        assert_eq!(set.label(3), "Saúde + SUS");
        assert_eq!(set.label(0), UNASSIGNED_LABEL);
    }

    #[test]
    fn macro_frequencies_sum_to_hundred() {
        let a = vec![1, 1, 2, 0, 0, 0, 3];
        let set = ThemeSet::new(
            vec![
                Macrotheme::new(1, ["a"]),
                Macrotheme::new(2, ["b"]),
                Macrotheme::new(3, ["c"]),
            ],
            false,
        )
        .unwrap();
        let f = macro_frequencies(&a, &set);
        let total: f64 = f.iter().map(|m| m.relative_frequency).sum();
        // Each label is rounded on its own, so the total may drift by up to
        // half a hundredth per label.
        assert!((total - 100.0).abs() <= 0.005 * f.len() as f64, "total was {total}");
        assert_eq!(f[0].macrotheme, UNASSIGNED_LABEL);
        assert_eq!(f[0].relative_frequency, 42.86);
    }

    #[test]
    fn macro_frequencies_round_each_label_independently() {
        let a = vec![1, 2, 3, 4, 0, 0, 0];
        let set = ThemeSet::new(
            (1..=4).map(|id| Macrotheme::new(id, [format!("t{id}")])).collect(),
            false,
        )
        .unwrap();
        let f = macro_frequencies(&a, &set);
        let shares: Vec<f64> = f.iter().map(|m| m.relative_frequency).collect();
        assert_eq!(shares, [42.86, 14.29, 14.29, 14.29, 14.29]);
        let total: f64 = shares.iter().sum();
        assert!((total - 100.02).abs() < 1e-9, "total was {total}");
    }

    #[test]
    fn daily_pivot_sorts_by_month_and_day_only() {
        let t = tagged_table();
        let set = themes();
        let a = assign_macrothemes(&t, &set).unwrap();
        let p = daily_pivot(&t, &a, &set);
        let keys: Vec<(i32, u32, u32, &str)> = p
            .iter()
            .map(|r| (r.year, r.month, r.day, r.macrotheme.as_str()))
            .collect();
        // December 2023 sorts after February 2024.
        assert_eq!(
            keys,
            vec![
                (2024, 1, 15, UNASSIGNED_LABEL),
                (2024, 1, 15, "tagA"),
                (2024, 2, 1, "tagB"),
                (2023, 12, 31, UNASSIGNED_LABEL),
            ]
        );
        assert_eq!(p[2].total_engagement, 10.0);
        assert_eq!(p[0].total_publications, 1);
    }

    #[test]
    fn pivot_skips_undated_rows() {
        let mut t = tagged_table();
        t.set_column("Dia", vec![Value::Null, Value::Null, Value::Null, Value::Number(31.0)]);
        let set = themes();
        let a = assign_macrothemes(&t, &set).unwrap();
        assert_eq!(daily_pivot(&t, &a, &set).len(), 1);
    }

    #[test]
    fn microthemes_are_binary_columns_after_service() {
        let mut t = tagged_table();
        t.set_column("Nota", num(&[3.0, 1.0, 0.0, 0.0]));
        t.set_column("Extras", vec![Value::text("X"), Value::Null, Value::Null, Value::Null]);
        let f = micro_frequencies(&t).unwrap();
        let names: Vec<&str> = f.iter().map(|m| m.microtheme.as_str()).collect();
        assert_eq!(names, ["tagA", "tagB", "tagC"]);
        assert_eq!(f[0].relative_frequency, 0.5);
        assert_eq!(f[1].relative_frequency, 0.25);
    }

    #[test]
    fn microthemes_need_service_column() {
        let mut t = tagged_table();
        t.drop_column("Serviço");
        assert!(matches!(
            micro_frequencies(&t),
            Err(PipelineError::MissingColumn(_))
        ));
    }

    #[test]
    fn classify_adds_assignment_column_and_summaries() {
        let mut t = tagged_table();
        let set = themes();
        let c = classify(&mut t, &set).unwrap();
        assert_eq!(t.cell(0, "Macrotema"), &Value::Number(2.0));
        assert_eq!(c.micro_frequencies.len(), 3);
        let shares: Vec<&str> = c.micro_shares.iter().map(|s| s.macrotheme.as_str()).collect();
        assert_eq!(shares, [UNASSIGNED_LABEL, "tagA", "tagB"]);
        assert_eq!(c.micro_shares[1].shares[0], ("tagA".to_string(), 100.0));

        let tables = c.summary_tables();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[3].1.height(), 3);
        assert!(tables[3].1.contains("tagC"));
    }

    #[test]
    fn rerunning_classify_ignores_previous_assignment_column() {
        let mut t = tagged_table();
        let set = themes();
        let first = classify(&mut t, &set).unwrap();
        let second = classify(&mut t, &set).unwrap();
        assert_eq!(first, second);
    }
}
