//! Geography lookups: Brazilian states (regions) and their municipalities
//! (localities).
//!
//! The wire shapes follow the IBGE localities API (`sigla`, `nome`).

use std::collections::HashMap;
use std::sync::Arc;

use freelando_forms::{collation_key, BoxFuture, Choice, LookupError, OptionsFetcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Additional attempts made after a failed lookup.
pub const DEFAULT_RETRIES: u32 = 2;

/// A federative unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// IBGE identifier.
    pub id: u32,
    /// Two-letter code, e.g. `SP`.
    #[serde(rename = "sigla")]
    pub code: String,
    /// Display name.
    #[serde(rename = "nome")]
    pub name: String,
}

/// A municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    /// IBGE identifier.
    pub id: u32,
    /// Display name.
    #[serde(rename = "nome")]
    pub name: String,
}

impl Locality {
    /// Creates a locality.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Source of regions and localities.
pub trait GeographyLookup: Send + Sync {
    /// Lists every region.
    fn list_regions(&self) -> BoxFuture<'_, Result<Vec<Region>, LookupError>>;

    /// Lists the localities of a region, by region code.
    fn list_localities<'a>(
        &'a self,
        region_code: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Locality>, LookupError>>;
}

/// The 27 Brazilian federative units as (IBGE id, code, name).
const BRAZILIAN_STATES: [(u32, &str, &str); 27] = [
    (12, "AC", "Acre"),
    (27, "AL", "Alagoas"),
    (16, "AP", "Amapá"),
    (13, "AM", "Amazonas"),
    (29, "BA", "Bahia"),
    (23, "CE", "Ceará"),
    (53, "DF", "Distrito Federal"),
    (32, "ES", "Espírito Santo"),
    (52, "GO", "Goiás"),
    (21, "MA", "Maranhão"),
    (51, "MT", "Mato Grosso"),
    (50, "MS", "Mato Grosso do Sul"),
    (31, "MG", "Minas Gerais"),
    (15, "PA", "Pará"),
    (25, "PB", "Paraíba"),
    (41, "PR", "Paraná"),
    (26, "PE", "Pernambuco"),
    (22, "PI", "Piauí"),
    (33, "RJ", "Rio de Janeiro"),
    (24, "RN", "Rio Grande do Norte"),
    (43, "RS", "Rio Grande do Sul"),
    (11, "RO", "Rondônia"),
    (14, "RR", "Roraima"),
    (42, "SC", "Santa Catarina"),
    (35, "SP", "São Paulo"),
    (28, "SE", "Sergipe"),
    (17, "TO", "Tocantins"),
];

/// In-memory geography, used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGeography {
    regions: Vec<Region>,
    localities: HashMap<String, Vec<Locality>>,
}

impl StaticGeography {
    /// Creates an empty geography.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Brazilian states with a sample of municipalities for the largest.
    pub fn brazil() -> Self {
        let regions = BRAZILIAN_STATES
            .iter()
            .map(|(id, code, name)| Region {
                id: *id,
                code: (*code).to_string(),
                name: (*name).to_string(),
            })
            .collect();

        Self {
            regions,
            localities: HashMap::new(),
        }
        .with_localities(
            "SP",
            vec![
                Locality::new(3_550_308, "São Paulo"),
                Locality::new(3_509_502, "Campinas"),
                Locality::new(3_548_500, "Santos"),
                Locality::new(3_547_809, "Santo André"),
                Locality::new(3_500_501, "Águas de Lindóia"),
            ],
        )
        .with_localities(
            "RJ",
            vec![
                Locality::new(3_304_557, "Rio de Janeiro"),
                Locality::new(3_303_302, "Niterói"),
                Locality::new(3_301_702, "Duque de Caxias"),
            ],
        )
        .with_localities(
            "MG",
            vec![
                Locality::new(3_106_200, "Belo Horizonte"),
                Locality::new(3_170_206, "Uberlândia"),
                Locality::new(3_136_702, "Juiz de Fora"),
            ],
        )
    }

    /// Sets the localities of a region.
    #[must_use]
    pub fn with_localities(mut self, region_code: &str, localities: Vec<Locality>) -> Self {
        self.localities.insert(region_code.to_string(), localities);
        self
    }
}

impl GeographyLookup for StaticGeography {
    fn list_regions(&self) -> BoxFuture<'_, Result<Vec<Region>, LookupError>> {
        Box::pin(async move { Ok(self.regions.clone()) })
    }

    fn list_localities<'a>(
        &'a self,
        region_code: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Locality>, LookupError>> {
        Box::pin(async move {
            if let Some(localities) = self.localities.get(region_code) {
                return Ok(localities.clone());
            }
            if self.regions.iter().any(|r| r.code == region_code) {
                Ok(Vec::new())
            } else {
                Err(LookupError::NotFound(region_code.to_string()))
            }
        })
    }
}

/// Retries a failing lookup a fixed number of additional times.
#[derive(Debug, Clone)]
pub struct RetryingGeography<G> {
    inner: G,
    retries: u32,
}

impl<G: GeographyLookup> RetryingGeography<G> {
    /// Wraps a lookup with [`DEFAULT_RETRIES`] retries.
    pub fn new(inner: G) -> Self {
        Self::with_retries(inner, DEFAULT_RETRIES)
    }

    /// Wraps a lookup with a custom retry budget.
    pub fn with_retries(inner: G, retries: u32) -> Self {
        Self { inner, retries }
    }

    async fn attempt<'a, T, F>(&'a self, what: &str, call: F) -> Result<T, LookupError>
    where
        F: Fn(&'a G) -> BoxFuture<'a, Result<T, LookupError>>,
    {
        let mut attempt = 0;
        loop {
            match call(&self.inner).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!(lookup = what, attempt, error = %e, "Retrying failed lookup");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<G: GeographyLookup> GeographyLookup for RetryingGeography<G> {
    fn list_regions(&self) -> BoxFuture<'_, Result<Vec<Region>, LookupError>> {
        Box::pin(self.attempt("regions", |g| g.list_regions()))
    }

    fn list_localities<'a>(
        &'a self,
        region_code: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Locality>, LookupError>> {
        Box::pin(self.attempt("localities", move |g| g.list_localities(region_code)))
    }
}

/// Regions as select choices, sorted by name with accents folded.
pub fn region_choices(regions: &[Region]) -> Vec<Choice> {
    let mut choices: Vec<Choice> = regions
        .iter()
        .map(|r| Choice::new(&r.code, &r.name))
        .collect();
    choices.sort_by_cached_key(|c| collation_key(&c.label));
    choices
}

/// Serves the localities of a region as options for a dependent select.
///
/// The option value is the locality name, which is what the draft stores.
pub struct LocalityOptions {
    geography: Arc<dyn GeographyLookup>,
}

impl LocalityOptions {
    /// Creates the adapter.
    pub fn new(geography: Arc<dyn GeographyLookup>) -> Self {
        Self { geography }
    }
}

impl OptionsFetcher for LocalityOptions {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<Choice>, LookupError>> {
        Box::pin(async move {
            let localities = self.geography.list_localities(key).await?;
            Ok(localities
                .into_iter()
                .map(|l| Choice::new(l.name.clone(), l.name))
                .collect())
        })
    }
}
