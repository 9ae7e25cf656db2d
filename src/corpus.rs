//! Plain-text corpora for downstream linguistic tooling.

use crate::columns;
use crate::config::SourceMode;
use crate::macrotheme::{Macrotheme, ThemeSet};
use crate::table::Table;

/// Characters removed from description text in the linguistic corpus.
pub const CORPUS_STRIP_CHARS: [char; 11] =
    ['|', ':', '*', '"', '?', '<', '>', '$', '-', '\'', '%'];

pub fn sanitize_corpus_text(text: &str) -> String {
    text.replace(&CORPUS_STRIP_CHARS[..], "")
}

/// The `Análise` column, one line per row, joined by `\n`.
pub fn analysis_corpus(table: &Table) -> String {
    analysis_lines(table, 0..table.height())
}

fn analysis_lines(table: &Table, rows: impl Iterator<Item = usize>) -> String {
    rows.map(|i| table.cell(i, columns::ANALYSIS).render())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `**** *id_{ID} *u_{name}` block per row followed by the sanitized
/// description. The name comes from the publisher, or the title for news.
pub fn linguistic_corpus(table: &Table, mode: SourceMode) -> String {
    let name_column = match mode {
        SourceMode::Publications => columns::PUBLISHER_NAME,
        SourceMode::News => columns::TITLE,
    };
    let mut out = String::new();
    for i in 0..table.height() {
        let id = table.cell(i, columns::ID);
        let name = table.cell(i, name_column);
        let text = sanitize_corpus_text(&table.cell(i, columns::DESCRIPTION).render());
        out.push_str(&format!("**** *id_{id} *u_{name}\n{text}\n"));
    }
    out
}

/// Analysis lines of the rows assigned to one macrotheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeCorpus {
    pub theme: Macrotheme,
    pub rows: usize,
    pub text: String,
}

impl ThemeCorpus {
    /// `macrotema-<id>_<tags>`; tags lowercased, spaces and path-hostile
    /// characters turned into `_`.
    pub fn file_stem(&self) -> String {
        let tags: Vec<String> = self
            .theme
            .tags
            .iter()
            .map(|t| {
                t.to_lowercase()
                    .chars()
                    .map(|c| match c {
                        ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                        c => c,
                    })
                    .collect()
            })
            .collect();
        format!("macrotema-{}_{}", self.theme.id, tags.join("_"))
    }
}

/// One corpus per macrotheme that claimed at least one row, in id order.
pub fn macrotheme_corpora(table: &Table, assignments: &[u8], themes: &ThemeSet) -> Vec<ThemeCorpus> {
    themes
        .iter()
        .filter_map(|theme| {
            let rows: Vec<usize> = assignments
                .iter()
                .enumerate()
                .filter(|(_, a)| **a == theme.id)
                .map(|(i, _)| i)
                .collect();
            if rows.is_empty() {
                return None;
            }
            Some(ThemeCorpus {
                theme: theme.clone(),
                rows: rows.len(),
                text: analysis_lines(table, rows.into_iter()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Value};

    #[test]
    fn linguistic_block_strips_punctuation_only_from_text() {
        let t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(7.0)]),
            Column::new("Nome publicador", vec![Value::text("Jane's Org")]),
            Column::new("Descrição", vec![Value::text("Great day! *wow*")]),
        ]);
        assert_eq!(
            linguistic_corpus(&t, SourceMode::Publications),
            "**** *id_7 *u_Jane's Org\nGreat day! wow\n"
        );
    }

    #[test]
    fn news_corpus_uses_title() {
        let t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(1.0)]),
            Column::new("Título", vec![Value::text("Manchete")]),
            Column::new("Descrição", vec![Value::text("50% - alta: \"sim\"?")]),
        ]);
        assert_eq!(
            linguistic_corpus(&t, SourceMode::News),
            "**** *id_1 *u_Manchete\n50  alta sim\n"
        );
    }

    #[test]
    fn analysis_corpus_has_no_trailing_newline() {
        let t = Table::from_columns(vec![Column::new(
            "Análise",
            vec![Value::text("a"), Value::text("b")],
        )]);
        assert_eq!(analysis_corpus(&t), "a\nb");
        assert_eq!(analysis_corpus(&Table::new(0)), "");
    }

    #[test]
    fn theme_corpora_skip_empty_themes() {
        let t = Table::from_columns(vec![Column::new(
            "Análise",
            vec![Value::text("r1"), Value::text("r2"), Value::text("r3")],
        )]);
        let themes = ThemeSet::new(
            vec![
                Macrotheme::new(1, ["Saúde Pública", "SUS"]),
                Macrotheme::new(2, ["Educação"]),
                Macrotheme::new(3, ["Vazio"]),
            ],
            false,
        )
        .unwrap();
        let corpora = macrotheme_corpora(&t, &[1, 2, 1], &themes);
        assert_eq!(corpora.len(), 2);
        assert_eq!(corpora[0].text, "r1\nr3");
        assert_eq!(corpora[0].rows, 2);
        assert_eq!(corpora[0].file_stem(), "macrotema-1_saúde_pública_sus");
        assert_eq!(corpora[1].file_stem(), "macrotema-2_educação");
    }
}
