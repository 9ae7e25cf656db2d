//! Splits the compound `Grupos` field into chamber, party and state, with a
//! fixed override table for parliamentarians the export labels ambiguously.

use crate::columns;
use crate::table::{Table, Value};

pub const CHAMBERS: [&str; 2] = ["CÂMARA", "SENADO"];

pub const PARTIES: [&str; 32] = [
    "MDB",
    "PT",
    "PRD",
    "PP",
    "PSDB",
    "PDT",
    "UNIÃO",
    "PL",
    "PODEMOS",
    "PSB",
    "REPUBLICANOS",
    "PV",
    "AVANTE",
    "PSC",
    "PSOL",
    "PCDOB",
    "PSD",
    "SOLIDARIEDADE",
    "NOVO",
    "REDE",
    "PMB",
    "UP",
    "DC",
    "PCO",
    "PSTU",
    "PCB",
    "PRTB",
    "MOBILIZA",
    "AGIR",
    "CIDADANIA",
    "PROS",
    "PATRIOTA",
];

pub const STATES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Abbreviations rewritten before matching the vocabularies.
const SYNONYMS: [(&str, &str); 2] = [("CAMARA", "CÂMARA"), ("PODE", "PODEMOS")];

/// Party and state forced on any row whose search profile mentions `name`.
#[derive(Debug, Clone, Copy)]
pub struct NameOverride {
    pub name: &'static str,
    pub party: &'static str,
    pub state: &'static str,
}

pub const NAME_OVERRIDES: [NameOverride; 8] = [
    NameOverride { name: "Nilto Tatto", party: "PT", state: "SP" },
    NameOverride { name: "Socorro Neri", party: "PP", state: "AC" },
    NameOverride { name: "AJ Albuquerque", party: "PP", state: "CE" },
    NameOverride { name: "Duarte Junior", party: "PSB", state: "MA" },
    NameOverride { name: "Julio Cesar", party: "PSD", state: "PI" },
    NameOverride { name: "Júlio César", party: "PSD", state: "PI" },
    NameOverride { name: "Vicentinho Júnior", party: "PP", state: "TO" },
    NameOverride { name: "Yury do Paredão", party: "MDB", state: "CE" },
];

/// Result of splitting one `Grupos` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub chamber: Option<String>,
    pub party: Option<String>,
    pub state: Option<String>,
    pub extras: Option<String>,
}

/// Splits a pipe-separated groups value. The first token of each vocabulary
/// wins; every other token lands in `extras`, joined with `" | "`.
pub fn decompose(groups: &str) -> Decomposition {
    let mut out = Decomposition::default();
    let mut extras: Vec<String> = Vec::new();

    for token in groups.to_uppercase().split('|').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        let token = SYNONYMS
            .iter()
            .find(|(alias, _)| *alias == token)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(token);

        if CHAMBERS.contains(&token) && out.chamber.is_none() {
            out.chamber = Some(token.to_string());
        } else if PARTIES.contains(&token) && out.party.is_none() {
            out.party = Some(token.to_string());
        } else if STATES.contains(&token) && out.state.is_none() {
            out.state = Some(token.to_string());
        } else {
            extras.push(token.to_string());
        }
    }

    if !extras.is_empty() {
        out.extras = Some(extras.join(" | "));
    }
    out
}

/// Replaces `Grupos` with `Casa`, `Partido`, `Estado` and `Extras`, applies
/// [`NAME_OVERRIDES`], then drops whichever of the three categorical columns
/// ended up empty.
pub fn decompose_groups(table: &mut Table) {
    if let Some(groups) = table.drop_column(columns::GROUPS) {
        let parts: Vec<Decomposition> = groups
            .values
            .iter()
            .map(|v| v.as_str().map(decompose).unwrap_or_default())
            .collect();

        let mut chamber = Vec::with_capacity(parts.len());
        let mut party = Vec::with_capacity(parts.len());
        let mut state = Vec::with_capacity(parts.len());
        let mut extras = Vec::with_capacity(parts.len());
        for d in parts {
            chamber.push(Value::from(d.chamber));
            party.push(Value::from(d.party));
            state.push(Value::from(d.state));
            extras.push(Value::from(d.extras));
        }
        table.set_column(columns::CHAMBER, chamber);
        table.set_column(columns::PARTY, party);
        table.set_column(columns::STATE, state);
        table.set_column(columns::EXTRAS, extras);
    }

    apply_name_overrides(table);

    for name in [columns::CHAMBER, columns::PARTY, columns::STATE] {
        if table.column(name).is_some_and(|v| v.iter().all(Value::is_null)) {
            table.drop_column(name);
        }
    }
}

/// Forces party/state for rows whose search profile contains an override
/// name, case-insensitively.
pub fn apply_name_overrides(table: &mut Table) {
    let Some(profiles) = table.column(columns::SEARCH_PROFILE) else {
        return;
    };
    let profiles: Vec<Option<String>> = profiles
        .iter()
        .map(|v| v.as_str().map(str::to_lowercase))
        .collect();

    let height = table.height();
    for column in [columns::PARTY, columns::STATE] {
        if !table.contains(column) {
            table.set_column(column, vec![Value::Null; height]);
        }
    }

    for rule in NAME_OVERRIDES {
        let needle = rule.name.to_lowercase();
        for (i, profile) in profiles.iter().enumerate() {
            if profile.as_deref().is_some_and(|p| p.contains(&needle)) {
                if let Some(party) = table.column_mut(columns::PARTY) {
                    party[i] = Value::text(rule.party);
                }
                if let Some(state) = table.column_mut(columns::STATE) {
                    state[i] = Value::text(rule.state);
                }
            }
        }
    }
}
