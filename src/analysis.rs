//! The per-row `Análise` summary line used by the text exports.

use crate::columns;
use crate::config::SourceMode;
use crate::table::{Table, Value};

/// Fields every publication row must carry before composing.
const PUBLICATION_FIELDS: [&str; 4] = [
    columns::ID,
    columns::DESCRIPTION,
    columns::ENGAGEMENT,
    columns::LINK,
];

const NEWS_FIELDS: [&str; 4] = [
    columns::ID,
    columns::TITLE,
    columns::DESCRIPTION,
    columns::LINK,
];

/// Creates any missing field column, filled with empty strings for every row.
pub fn ensure_columns(table: &mut Table, names: &[&str]) {
    let height = table.height();
    for name in names {
        if !table.contains(name) {
            table.set_column(name, vec![Value::text(""); height]);
        }
    }
}

/// `"ID: 7 | Texto: ... | Engajamento: 12 | Link: https://..."`
pub fn publication_line(id: &Value, text: &Value, engagement: &Value, link: &Value) -> String {
    format!("ID: {id} | Texto: {text} | Engajamento: {engagement} | Link: {link}")
}

/// `"7 | Título: ... | Texto: ... | Link: https://..."`
pub fn news_line(id: &Value, title: &Value, text: &Value, link: &Value) -> String {
    format!("{id} | Título: {title} | Texto: {text} | Link: {link}")
}

/// Writes (or overwrites) the `Análise` column.
pub fn compose_analysis(table: &mut Table, mode: SourceMode) {
    let fields = match mode {
        SourceMode::Publications => PUBLICATION_FIELDS,
        SourceMode::News => NEWS_FIELDS,
    };
    ensure_columns(table, &fields);

    let lines: Vec<Value> = (0..table.height())
        .map(|i| {
            let [a, b, c, d] = fields.map(|f| table.cell(i, f));
            let line = match mode {
                SourceMode::Publications => publication_line(a, b, c, d),
                SourceMode::News => news_line(a, b, c, d),
            };
            Value::Text(line)
        })
        .collect();
    table.set_column(columns::ANALYSIS, lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn missing_fields_become_empty_columns() {
        let mut t = Table::from_columns(vec![Column::new(
            "ID",
            vec![Value::Number(1.0), Value::Number(2.0)],
        )]);
        compose_analysis(&mut t, SourceMode::Publications);
        assert_eq!(t.cell(1, "Descrição"), &Value::text(""));
        assert_eq!(t.cell(1, "Link ocorrência"), &Value::text(""));
        assert_eq!(
            t.cell(0, "Análise"),
            &Value::text("ID: 1 | Texto:  | Engajamento:  | Link: ")
        );
    }

    #[test]
    fn composes_publication_line() {
        let mut t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(7.0)]),
            Column::new("Descrição", vec![Value::text("Bom dia")]),
            Column::new("Manifestações", vec![Value::Number(12.0)]),
            Column::new("Link ocorrência", vec![Value::text("https://x.y/1")]),
        ]);
        compose_analysis(&mut t, SourceMode::Publications);
        assert_eq!(
            t.cell(0, "Análise"),
            &Value::text("ID: 7 | Texto: Bom dia | Engajamento: 12 | Link: https://x.y/1")
        );
    }

    #[test]
    fn recomposing_overwrites_instead_of_appending() {
        let mut t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(3.0)]),
            Column::new("Descrição", vec![Value::text("x")]),
        ]);
        compose_analysis(&mut t, SourceMode::Publications);
        let first = t.clone();
        compose_analysis(&mut t, SourceMode::Publications);
        assert_eq!(t, first);
        assert_eq!(t.column_names().filter(|c| *c == "Análise").count(), 1);
    }

    #[test]
    fn composes_news_line() {
        let mut t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(2.0)]),
            Column::new("Título", vec![Value::text("Manchete")]),
            Column::new("Descrição", vec![Value::text("Corpo")]),
        ]);
        compose_analysis(&mut t, SourceMode::News);
        assert_eq!(
            t.cell(0, "Análise"),
            &Value::text("2 | Título: Manchete | Texto: Corpo | Link: ")
        );
    }
}
