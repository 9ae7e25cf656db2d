//! Column-level cleaning: real engagement, administrative column removal,
//! placeholder nulls and canonical profile/service names.

use log::debug;

use crate::columns;
use crate::config::SourceMode;
use crate::table::{Table, Value};

/// Raw per-network reaction counters summed into real engagement.
pub const ENGAGEMENT_COLUMNS: [&str; 19] = [
    "comments",
    "shares",
    "likes",
    "dislikes",
    "love",
    "wow",
    "haha",
    "sad",
    "angry",
    "thankful",
    "pride",
    "retweets",
    "favorites",
    "rating",
    "vendas",
    "resenhas",
    "votes",
    "views",
    "quotes",
];

/// Administrative and raw-metric columns removed from publication exports.
pub const UNNECESSARY_COLUMNS: &[&str] = &[
    "Descrição monitoramento",
    "Link serviço",
    "Descrição Pai",
    "Link ocorrência Pai",
    "Thumbnail",
    "Thumbnail pai",
    "Data coleta",
    "Linguagem",
    "Foto publicador",
    "PageRank",
    "Estrelas",
    "Qualificação",
    "Qualificada por",
    "Data da qualificação",
    "Qualificação automática",
    "Para",
    "Latitude",
    "Longitude",
    "Id ocorrência no serviço",
    "Id ocorrência pai no serviço",
    "Link id ocorrência pai",
    "Arquivada",
    "Desarquivada",
    "Data Resposta",
    "Manifestações Detalhadas",
    "Termos",
    "Links",
    "Perfis",
    "Hashtags",
    "comments",
    "shares",
    "likes",
    "dislikes",
    "love",
    "wow",
    "haha",
    "sad",
    "angry",
    "thankful",
    "pride",
    "retweets",
    "favorites",
    "rating",
    "vendas",
    "resenhas",
    "votes",
    "views",
    "quotes",
    "videoViews",
    "URL da busca",
    "Id publicador",
    "Qualificação aprovada por",
    "Analisada por",
    "Data analisada",
    "Avaliação",
    "Tipo/Conteúdo",
    "Observação",
    "Unnamed: 73",
];

/// News exports carry no engagement or location worth keeping.
const NEWS_EXTRA_COLUMNS: [&str; 2] = [columns::ENGAGEMENT, "Cidade/Estado"];

/// Literal the export uses for "no value".
const PLACEHOLDER: &str = "-";

/// Columns whose values are cut at the first `-` or `,`.
const CANONICAL_NAME_COLUMNS: [&str; 2] = [columns::SEARCH_PROFILE, columns::SERVICE];

/// Runs every column-cleaning step for the given source mode.
pub fn normalize_columns(table: &mut Table, mode: SourceMode) {
    match mode {
        SourceMode::Publications => {
            add_real_engagement(table);
            drop_columns(table, UNNECESSARY_COLUMNS);
        }
        SourceMode::News => {
            drop_columns(table, UNNECESSARY_COLUMNS);
            drop_columns(table, &NEWS_EXTRA_COLUMNS);
        }
    }
    null_placeholders(table);
    drop_empty_columns(table);
    if mode == SourceMode::Publications {
        canonicalize_names(table);
    }
}

/// Sums the engagement columns present into `Manifestações reais`, placed
/// right after `Manifestações` when that column exists. Values that are not
/// numbers contribute zero.
pub fn add_real_engagement(table: &mut Table) {
    let present: Vec<&str> = ENGAGEMENT_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.contains(c))
        .collect();
    if present.is_empty() {
        return;
    }

    let totals: Vec<Value> = (0..table.height())
        .map(|i| {
            let sum: f64 = present
                .iter()
                .map(|c| table.cell(i, c).to_number_or_zero())
                .sum();
            Value::Number(sum)
        })
        .collect();

    let index = table
        .position(columns::ENGAGEMENT)
        .map(|i| i + 1)
        .unwrap_or(table.width());
    table.insert_column(index, columns::REAL_ENGAGEMENT, totals);
}

/// Removes the named columns that exist; absent names are ignored.
pub fn drop_columns(table: &mut Table, names: &[&str]) {
    let before = table.width();
    table.retain_columns(|c| !names.contains(&c.name.as_str()));
    debug!("Dropped {} listed columns", before - table.width());
}

/// Turns the `-` placeholder into null everywhere.
pub fn null_placeholders(table: &mut Table) {
    table.for_each_value_mut(|v| {
        if v.as_str() == Some(PLACEHOLDER) {
            *v = Value::Null;
        }
    });
}

/// Drops columns that hold no value in any row.
pub fn drop_empty_columns(table: &mut Table) {
    if table.height() == 0 {
        return;
    }
    let empty: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.is_all_null())
        .map(|c| c.name.clone())
        .collect();
    for name in &empty {
        table.drop_column(name);
    }
    if !empty.is_empty() {
        debug!("Dropped empty columns: {}", empty.join(", "));
    }
}

/// `"Fulano de Tal - Deputado, SP"` → `"Fulano de Tal"`.
pub fn canonical_name(s: &str) -> String {
    s.split(['-', ','])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Applies [`canonical_name`] to the search-profile and service columns.
/// Non-text cells become null.
pub fn canonicalize_names(table: &mut Table) {
    for name in CANONICAL_NAME_COLUMNS {
        if let Some(values) = table.column_mut(name) {
            for v in values.iter_mut() {
                *v = match v.as_str() {
                    Some(s) => Value::Text(canonical_name(s)),
                    None => Value::Null,
                };
            }
        }
    }
}
