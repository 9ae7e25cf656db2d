//! Publication timestamp splitting and the parliamentarian display name.

use chrono::{Datelike, NaiveDate};
use log::warn;

use crate::columns;
use crate::table::{Table, Value};

/// Date layout used by the export (`01/02/24`).
const SHORT_DATE_FORMAT: &str = "%d/%m/%y";
/// Canonical four-digit-year layout written back (`01/02/2024`).
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Parts of one `Data publicação` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAt {
    pub date: String,
    pub hour: String,
}

/// `"01/02/24 13:45"` → date `"01/02/24"`, hour `"13:45"`: the first eight
/// characters and everything from the tenth on, both trimmed.
pub fn split_published_at(raw: &str) -> PublishedAt {
    let date: String = raw.chars().take(8).collect();
    let hour: String = raw.chars().skip(9).collect();
    PublishedAt {
        date: date.trim().to_string(),
        hour: hour.trim().to_string(),
    }
}

/// Parses a two-digit-year `dd/mm/yy` date.
pub fn parse_short_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, SHORT_DATE_FORMAT).ok()
}

/// Splits `Data publicação` into date/hour columns and derives `Dia`, `Mês`,
/// `Ano` and `Hora`. Unparsable dates become nulls for that row only.
pub fn enrich_dates(table: &mut Table) {
    let Some(published) = table.drop_column(columns::PUBLISHED_AT) else {
        warn!(
            "Column '{}' not found; no date fields derived",
            columns::PUBLISHED_AT
        );
        return;
    };

    let height = table.height();
    let mut dates = Vec::with_capacity(height);
    let mut hours = Vec::with_capacity(height);
    let mut days = Vec::with_capacity(height);
    let mut months = Vec::with_capacity(height);
    let mut years = Vec::with_capacity(height);
    let mut hour_of_day = Vec::with_capacity(height);
    let mut unparsed = 0usize;

    for value in &published.values {
        let Some(raw) = value.as_str() else {
            for column in [&mut dates, &mut hours, &mut days, &mut months, &mut years, &mut hour_of_day] {
                column.push(Value::Null);
            }
            continue;
        };
        let parts = split_published_at(raw);

        match parse_short_date(&parts.date) {
            Some(date) => {
                let canonical = date.format(DATE_FORMAT).to_string();
                // Day/month/year are read back from the canonical string.
                let reparsed = NaiveDate::parse_from_str(&canonical, DATE_FORMAT).ok();
                dates.push(Value::Text(canonical));
                days.push(reparsed.map(|d| d.day() as f64).into());
                months.push(reparsed.map(|d| d.month() as f64).into());
                years.push(reparsed.map(|d| d.year() as f64).into());
            }
            None => {
                unparsed += 1;
                dates.push(Value::Null);
                days.push(Value::Null);
                months.push(Value::Null);
                years.push(Value::Null);
            }
        }

        hour_of_day.push(Value::Text(parts.hour.chars().take(2).collect()));
        hours.push(Value::Text(parts.hour));
    }

    if unparsed > 0 {
        warn!("{unparsed} rows have an unparsable publication date");
    }

    table.set_column(columns::PUBLISHED_DATE, dates);
    table.set_column(columns::PUBLISHED_HOUR, hours);
    table.set_column(columns::DAY, days);
    table.set_column(columns::MONTH, months);
    table.set_column(columns::YEAR, years);
    table.set_column(columns::HOUR, hour_of_day);
}

/// Honorific for a chamber value.
pub fn title_for_chamber(chamber: &str) -> &'static str {
    match chamber {
        "CÂMARA" => "Deputado(a)",
        "SENADO" => "Senador(a)",
        _ => "",
    }
}

/// Adds `Parlamentar` (e.g. `"Deputado(a) Nilto Tatto (PT/SP)"`) when the
/// chamber, profile, party and state columns all exist.
pub fn add_parliamentarian(table: &mut Table) {
    let required = [
        columns::CHAMBER,
        columns::SEARCH_PROFILE,
        columns::PARTY,
        columns::STATE,
    ];
    if !required.iter().all(|c| table.contains(c)) {
        return;
    }

    let names: Vec<Value> = (0..table.height())
        .map(|i| {
            let chamber = table.cell(i, columns::CHAMBER).render();
            let name = table.cell(i, columns::SEARCH_PROFILE).render();
            let party = table.cell(i, columns::PARTY).render();
            let state = table.cell(i, columns::STATE).render();
            let title = title_for_chamber(&chamber);
            let label = if title.is_empty() {
                name
            } else {
                format!("{title} {name}")
            };
            Value::Text(format!("{label} ({party}/{state})"))
        })
        .collect();
    table.set_column(columns::PARLIAMENTARIAN, names);
}

/// The full temporal stage: display name first, then the date fields.
pub fn enrich_temporal(table: &mut Table) {
    add_parliamentarian(table);
    enrich_dates(table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn splits_date_and_hour() {
        let p = split_published_at("01/02/24 13:45");
        assert_eq!(p.date, "01/02/24");
        assert_eq!(p.hour, "13:45");
        let short = split_published_at("01/02/24");
        assert_eq!(short.hour, "");
    }

    #[test]
    fn two_digit_years_land_in_this_century() {
        assert_eq!(parse_short_date("01/02/24"), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(parse_short_date("31/02/24"), None);
        assert_eq!(parse_short_date("garbage"), None);
    }

    #[test]
    fn enriches_date_columns() {
        let mut t = Table::from_columns(vec![
            Column::new("ID", vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]),
            Column::new(
                "Data publicação",
                vec![Value::text("01/02/24 13:45"), Value::text("99/99/99 08:00"), Value::Null],
            ),
        ]);
        enrich_temporal(&mut t);
        assert!(!t.contains("Data publicação"));
        assert_eq!(t.cell(0, "Data publicação - Date"), &Value::text("01/02/2024"));
        assert_eq!(t.cell(0, "Dia"), &Value::Number(1.0));
        assert_eq!(t.cell(0, "Mês"), &Value::Number(2.0));
        assert_eq!(t.cell(0, "Ano"), &Value::Number(2024.0));
        assert_eq!(t.cell(0, "Hora"), &Value::text("13"));

        assert!(t.cell(1, "Data publicação - Date").is_null());
        assert!(t.cell(1, "Dia").is_null());
        assert_eq!(t.cell(1, "Hora"), &Value::text("08"));

        assert!(t.cell(2, "Ano").is_null());
        assert!(t.cell(2, "Hora").is_null());
        assert_eq!(t.height(), 3);
    }

    #[test]
    fn parliamentarian_needs_all_four_columns() {
        let mut partial = Table::from_columns(vec![
            Column::new("Casa", vec![Value::text("CÂMARA")]),
            Column::new("Perfil/Nome da busca", vec![Value::text("Nilto Tatto")]),
            Column::new("Partido", vec![Value::text("PT")]),
        ]);
        add_parliamentarian(&mut partial);
        assert!(!partial.contains("Parlamentar"));

        let mut full = partial.clone();
        full.set_column("Estado", vec![Value::text("SP")]);
        add_parliamentarian(&mut full);
        assert_eq!(
            full.cell(0, "Parlamentar"),
            &Value::text("Deputado(a) Nilto Tatto (PT/SP)")
        );
    }

    #[test]
    fn parliamentarian_without_chamber_has_no_title() {
        let mut t = Table::from_columns(vec![
            Column::new("Casa", vec![Value::Null]),
            Column::new("Perfil/Nome da busca", vec![Value::text("Fulana")]),
            Column::new("Partido", vec![Value::text("PSOL")]),
            Column::new("Estado", vec![Value::Null]),
        ]);
        add_parliamentarian(&mut t);
        assert_eq!(t.cell(0, "Parlamentar"), &Value::text("Fulana (PSOL/)"));
    }
}
