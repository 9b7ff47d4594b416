//! Public catalog client
//!
//! Read-only access to the public Pokémon catalog. Every read goes through
//! the shared cache for deduplication; nothing here ever invalidates it.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::cache::{QueryCache, QueryDefinition, Subscription};
use crate::error::ApiResult;
use crate::http::{ensure_success, join_url, read_json};
use crate::models::{
    AbilityField, CatalogPage, PokemonDetail, PokemonRef, PokemonSummary, TypeField, TypeName,
};

const TYPES_ENDPOINT: &str = "catalog.types";
const BY_TYPE_ENDPOINT: &str = "catalog.by_type";
const PAGE_ENDPOINT: &str = "catalog.page";
const DETAIL_ENDPOINT: &str = "catalog.detail";

// Upstream response shapes

#[derive(Debug, Deserialize)]
struct NamedList {
    #[serde(default)]
    results: Vec<PokemonRef>,
}

#[derive(Debug, Deserialize)]
struct PagedList {
    count: u64,
    #[serde(default)]
    results: Vec<PokemonRef>,
}

#[derive(Debug, Deserialize)]
struct TypeMembers {
    #[serde(default)]
    pokemon: Vec<TypeSlot>,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    pokemon: PokemonRef,
}

#[derive(Debug, Deserialize)]
struct CatalogSprites {
    front_default: Option<String>,
}

/// `/pokemon/{id}` as the catalog serves it
#[derive(Debug, Deserialize)]
struct CatalogPokemon {
    id: u32,
    name: String,
    height: Option<u32>,
    weight: Option<u32>,
    sprites: Option<CatalogSprites>,
    #[serde(default)]
    abilities: Vec<AbilityField>,
    #[serde(default)]
    types: Vec<TypeField>,
}

impl From<CatalogPokemon> for PokemonDetail {
    fn from(raw: CatalogPokemon) -> Self {
        PokemonDetail {
            id: raw.id,
            name: raw.name,
            sprite_url: raw.sprites.and_then(|s| s.front_default),
            height_decimeters: raw.height,
            weight_hectograms: raw.weight,
            abilities: raw
                .abilities
                .into_iter()
                .filter_map(|a| a.visible_name())
                .collect(),
            types: raw.types.into_iter().map(|t| t.into_name()).collect(),
            caught_at: None,
        }
    }
}

/// Cached reader for the public catalog.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    cache: QueryCache,
    keep_unused_for: Duration,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, cache: QueryCache) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache,
            keep_unused_for: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_keep_unused_for(mut self, keep: Duration) -> Self {
        self.keep_unused_for = keep;
        self
    }

    /// All type names, in catalog order.
    pub fn list_types(&self) -> ApiResult<Subscription<Vec<TypeName>>> {
        let definition = QueryDefinition::new(TYPES_ENDPOINT, &())?
            .keep_unused_for(self.keep_unused_for);
        let url = join_url(&self.base_url, "type");
        self.subscribe(definition, url, "list types", |list: NamedList| {
            list.results.into_iter().map(|r| r.name).collect()
        })
    }

    /// Pokémon of one type, as summaries with ids taken from their URLs.
    pub fn list_by_type(&self, type_name: &str) -> ApiResult<Subscription<Vec<PokemonSummary>>> {
        let type_name = type_name.trim().to_lowercase();
        let definition = QueryDefinition::new(BY_TYPE_ENDPOINT, &type_name)?
            .keep_unused_for(self.keep_unused_for);
        let url = join_url(
            &self.base_url,
            &format!("type/{}", urlencoding::encode(&type_name)),
        );
        self.subscribe(definition, url, "list by type", |members: TypeMembers| {
            members
                .pokemon
                .iter()
                .map(|slot| PokemonSummary::from_ref(&slot.pokemon))
                .collect()
        })
    }

    /// One page of the full catalog.
    pub fn list_page(&self, limit: u32, offset: u32) -> ApiResult<Subscription<CatalogPage>> {
        let params = serde_json::json!({ "limit": limit, "offset": offset });
        let definition = QueryDefinition::new(PAGE_ENDPOINT, &params)?
            .keep_unused_for(self.keep_unused_for);
        let url = format!(
            "{}?limit={}&offset={}",
            join_url(&self.base_url, "pokemon"),
            limit,
            offset
        );
        self.subscribe(definition, url, "list catalog page", |page: PagedList| {
            CatalogPage {
                items: page.results.iter().map(PokemonSummary::from_ref).collect(),
                count: page.count,
            }
        })
    }

    pub fn get_by_id(&self, id: u32) -> ApiResult<Subscription<PokemonDetail>> {
        self.get_detail(id.to_string())
    }

    pub fn get_by_name(&self, name: &str) -> ApiResult<Subscription<PokemonDetail>> {
        self.get_detail(name.trim().to_lowercase())
    }

    fn get_detail(&self, id_or_name: String) -> ApiResult<Subscription<PokemonDetail>> {
        let definition = QueryDefinition::new(DETAIL_ENDPOINT, &id_or_name)?
            .keep_unused_for(self.keep_unused_for);
        let url = join_url(
            &self.base_url,
            &format!("pokemon/{}", urlencoding::encode(&id_or_name)),
        );
        self.subscribe(definition, url, "get catalog pokemon", |raw: CatalogPokemon| {
            PokemonDetail::from(raw)
        })
    }

    fn subscribe<Raw, T, M>(
        &self,
        definition: QueryDefinition<T>,
        url: String,
        operation: &'static str,
        map: M,
    ) -> ApiResult<Subscription<T>>
    where
        Raw: DeserializeOwned + Send + 'static,
        T: Send + Sync + 'static,
        M: Fn(Raw) -> T + Send + Sync + Copy + 'static,
    {
        let http = self.http.clone();
        self.cache.subscribe(definition, move || {
            fetch_catalog(http.clone(), url.clone(), operation, map)
        })
    }
}

fn fetch_catalog<Raw, T, M>(
    http: reqwest::Client,
    url: String,
    operation: &'static str,
    map: M,
) -> impl Future<Output = ApiResult<T>> + Send + 'static
where
    Raw: DeserializeOwned + Send + 'static,
    T: Send + 'static,
    M: Fn(Raw) -> T + Send + 'static,
{
    async move {
        log::debug!("Fetching {} from catalog", url);
        let response = http.get(&url).send().await?;
        let response = ensure_success(response, operation).await?;
        let raw: Raw = read_json(response).await?;
        Ok(map(raw))
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
