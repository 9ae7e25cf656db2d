//! Header names of the monitoring export and of the columns the pipeline derives.

pub const ID: &str = "ID";
pub const DESCRIPTION: &str = "Descrição";
pub const TITLE: &str = "Título";
pub const PUBLISHER_NAME: &str = "Nome publicador";
pub const LINK: &str = "Link ocorrência";
pub const ENGAGEMENT: &str = "Manifestações";
pub const REAL_ENGAGEMENT: &str = "Manifestações reais";
pub const SEARCH_PROFILE: &str = "Perfil/Nome da busca";
pub const SERVICE: &str = "Serviço";
pub const GROUPS: &str = "Grupos";

pub const CHAMBER: &str = "Casa";
pub const PARTY: &str = "Partido";
pub const STATE: &str = "Estado";
pub const EXTRAS: &str = "Extras";
pub const PARLIAMENTARIAN: &str = "Parlamentar";

pub const PUBLISHED_AT: &str = "Data publicação";
pub const PUBLISHED_DATE: &str = "Data publicação - Date";
pub const PUBLISHED_HOUR: &str = "Data publicação - Hour";
pub const DAY: &str = "Dia";
pub const MONTH: &str = "Mês";
pub const YEAR: &str = "Ano";
pub const HOUR: &str = "Hora";

pub const ANALYSIS: &str = "Análise";
pub const MACROTHEME: &str = "Macrotema";
pub const MACROTHEME_NAME: &str = "Macrotema Nome";
