//! Picks which record a detail view shows: the personal one when the
//! Pokémon has been caught, the catalog one otherwise.

use std::fmt;
use std::sync::Arc;

use crate::api::{CatalogClient, CollectionClient};
use crate::error::{ApiError, ApiResult};
use crate::models::PokemonDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailSource {
    /// Caught; can be released
    Collection,
    /// Not caught; can be caught
    Catalog,
}

impl fmt::Display for DetailSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailSource::Collection => f.write_str("collection"),
            DetailSource::Catalog => f.write_str("catalog"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDetail {
    pub detail: Arc<PokemonDetail>,
    pub source: DetailSource,
}

impl ResolvedDetail {
    pub fn is_caught(&self) -> bool {
        self.source == DetailSource::Collection
    }
}

/// Prefer the personal record, else the catalog record, else nothing.
pub fn resolve_detail(
    personal: Option<Arc<PokemonDetail>>,
    catalog: Option<Arc<PokemonDetail>>,
) -> Option<ResolvedDetail> {
    match (personal, catalog) {
        (Some(detail), _) => Some(ResolvedDetail {
            detail,
            source: DetailSource::Collection,
        }),
        (None, Some(detail)) => Some(ResolvedDetail {
            detail,
            source: DetailSource::Catalog,
        }),
        (None, None) => None,
    }
}

/// Load a detail in two steps: the personal record first (skipped when
/// `collection` is `None`), then the catalog if that one does not exist.
///
/// Only `NotFound` from the collection falls through to the catalog; any
/// other collection failure is returned as is.
pub async fn load_detail(
    collection: Option<&CollectionClient>,
    catalog: &CatalogClient,
    id: u32,
) -> ApiResult<ResolvedDetail> {
    let personal = match collection {
        Some(collection) => {
            let mut subscription = collection.get_detail(id)?;
            match subscription.data().await {
                Ok(detail) => Some(detail),
                Err(e) if e.is_not_found() => {
                    log::debug!("#{} not in collection, using catalog", id);
                    None
                }
                Err(e) => return Err(e),
            }
        }
        None => None,
    };

    let catalog_detail = match personal {
        Some(_) => None,
        None => Some(catalog.get_by_id(id)?.data().await?),
    };

    resolve_detail(personal, catalog_detail)
        .ok_or_else(|| ApiError::NotFound(format!("pokemon {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: u32, name: &str) -> Arc<PokemonDetail> {
        Arc::new(PokemonDetail {
            id,
            name: name.to_string(),
            sprite_url: None,
            height_decimeters: None,
            weight_hectograms: None,
            abilities: Vec::new(),
            types: Vec::new(),
            caught_at: None,
        })
    }

    #[test]
    fn personal_record_wins() {
        let resolved =
            resolve_detail(Some(detail(25, "mine")), Some(detail(25, "catalog"))).unwrap();
        assert_eq!(resolved.source, DetailSource::Collection);
        assert_eq!(resolved.detail.name, "mine");
        assert!(resolved.is_caught());
    }

    #[test]
    fn catalog_is_the_fallback() {
        let resolved = resolve_detail(None, Some(detail(25, "catalog"))).unwrap();
        assert_eq!(resolved.source, DetailSource::Catalog);
        assert!(!resolved.is_caught());
    }

    #[test]
    fn nothing_resolves_to_none() {
        assert!(resolve_detail(None, None).is_none());
    }
}
