//! Normalized records shared by the catalog and collection clients

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;
use crate::utils::{default_sprite_url, extract_id_from_url};

/// Page sizes the collection table offers
pub const PAGE_SIZES: [u32; 4] = [5, 10, 20, 50];

/// Pokémon type name as the catalog spells it ("fire", "water", ...)
pub type TypeName = String;

/// Named link to a catalog resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRef {
    pub name: String,
    pub url: String,
}

impl PokemonRef {
    /// Numeric id parsed from the resource URL, if it ends in one.
    pub fn id(&self) -> Option<u32> {
        extract_id_from_url(&self.url)
    }
}

/// One row of a list view.
///
/// `id` is `None` when the catalog URL carried no numeric id; such rows can
/// only be shown by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PokemonSummary {
    pub id: Option<u32>,
    pub name: String,
    pub sprite_url: Option<String>,
}

impl PokemonSummary {
    pub fn from_ref(reference: &PokemonRef) -> Self {
        let id = reference.id();
        Self {
            id,
            name: reference.name.clone(),
            sprite_url: id.map(default_sprite_url),
        }
    }
}

/// Full record of one Pokémon, from either source.
///
/// Serializes in the personal backend's field names, which is also the
/// snapshot body sent when catching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonDetail {
    pub id: u32,
    pub name: String,
    #[serde(
        rename = "sprite_front_default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sprite_url: Option<String>,
    #[serde(rename = "height_dm", alias = "height", default)]
    pub height_decimeters: Option<u32>,
    #[serde(rename = "weight_hg", alias = "weight", default)]
    pub weight_hectograms: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_abilities")]
    pub abilities: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_types")]
    pub types: Vec<String>,
    /// Only set for records from the personal collection
    #[serde(rename = "caughtAt", default, skip_serializing_if = "Option::is_none")]
    pub caught_at: Option<DateTime<Utc>>,
}

impl PokemonDetail {
    pub fn summary(&self) -> PokemonSummary {
        PokemonSummary {
            id: Some(self.id),
            name: self.name.clone(),
            sprite_url: Some(self.sprite()),
        }
    }

    /// Own sprite, or the fallback image for the id.
    pub fn sprite(&self) -> String {
        self.sprite_url
            .clone()
            .unwrap_or_else(|| default_sprite_url(self.id))
    }
}

/// Ability entry as either source writes it: a bare name, or a record with
/// a hidden flag whose `ability` is a name or a named resource.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AbilityField {
    Name(String),
    Entry {
        ability: NameField,
        #[serde(default)]
        is_hidden: bool,
    },
}

impl AbilityField {
    /// Name of a visible ability; hidden abilities are skipped.
    pub(crate) fn visible_name(self) -> Option<String> {
        match self {
            AbilityField::Name(name) => Some(name),
            AbilityField::Entry {
                is_hidden: true, ..
            } => None,
            AbilityField::Entry { ability, .. } => Some(ability.into_name()),
        }
    }
}

/// Type entry: bare name or catalog slot `{ "type": { "name": .. } }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TypeField {
    Name(String),
    Slot {
        #[serde(rename = "type")]
        kind: NameField,
    },
}

impl TypeField {
    pub(crate) fn into_name(self) -> String {
        match self {
            TypeField::Name(name) => name,
            TypeField::Slot { kind } => kind.into_name(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NameField {
    Plain(String),
    Resource { name: String },
}

impl NameField {
    fn into_name(self) -> String {
        match self {
            NameField::Plain(name) | NameField::Resource { name } => name,
        }
    }
}

fn deserialize_abilities<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<AbilityField>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(AbilityField::visible_name)
        .collect())
}

fn deserialize_types<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<TypeField>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(TypeField::into_name)
        .collect())
}

/// Row of the personal collection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaughtPokemon {
    pub id: u32,
    pub name: String,
    #[serde(rename = "sprite_front_default", default)]
    pub sprite_url: Option<String>,
    #[serde(rename = "caughtAt")]
    pub caught_at: DateTime<Utc>,
    #[serde(default, alias = "height")]
    pub height_dm: Option<u32>,
    #[serde(default, alias = "weight")]
    pub weight_hg: Option<u32>,
}

impl CaughtPokemon {
    pub fn summary(&self) -> PokemonSummary {
        PokemonSummary {
            id: Some(self.id),
            name: self.name.clone(),
            sprite_url: Some(
                self.sprite_url
                    .clone()
                    .unwrap_or_else(|| default_sprite_url(self.id)),
            ),
        }
    }
}

/// One page of the personal collection, in server order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPage {
    pub items: Vec<CaughtPokemon>,
    pub total: u64,
}

impl CollectionPage {
    pub fn contains(&self, id: u32) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One page of the public catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<PokemonSummary>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchReceipt {
    pub caught: bool,
    #[serde(alias = "pokemonId")]
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReceipt {
    pub released: bool,
    #[serde(alias = "pokemonId")]
    pub id: u32,
    /// Collection size after the release, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[default]
    #[serde(rename = "caughtAt")]
    CaughtAt,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::CaughtAt => "caughtAt",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortBy::Name),
            "caughtat" | "caught-at" | "caught_at" => Ok(SortBy::CaughtAt),
            other => Err(ApiError::Validation(format!(
                "unknown sort field '{}' (expected name or caughtAt)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDir {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            other => Err(ApiError::Validation(format!(
                "unknown sort direction '{}' (expected asc or desc)",
                other
            ))),
        }
    }
}

/// Parameters of a collection list request.
///
/// Serializes to the backend's query string (`page`, `pageSize`, `search`,
/// `sortBy`, `sortDir`); `search` is omitted when unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_dir: SortDir,
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            sort_by: SortBy::CaughtAt,
            sort_dir: SortDir::Desc,
        }
    }
}

impl CollectionQuery {
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the name filter; blank input clears it.
    #[must_use]
    pub fn search(mut self, search: Option<&str>) -> Self {
        self.search = search.and_then(normalize_search);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: SortBy, sort_dir: SortDir) -> Self {
        self.sort_by = sort_by;
        self.sort_dir = sort_dir;
        self
    }

    /// Reject parameters the backend would not accept.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.page < 1 {
            return Err(ApiError::Validation("page must be at least 1".to_string()));
        }
        if !PAGE_SIZES.contains(&self.page_size) {
            return Err(ApiError::Validation(format!(
                "page size {} not allowed (choose one of {:?})",
                self.page_size, PAGE_SIZES
            )));
        }
        Ok(())
    }
}

/// Trimmed search text, `None` when nothing is left.
pub fn normalize_search(search: &str) -> Option<String> {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
