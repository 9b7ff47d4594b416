//! Personal collection client
//!
//! Reads and writes the signed-in user's collection on the personal backend.
//! List reads provide the collection list tag plus one tag per item; catch
//! and release invalidate the list tag and the item's tag once the backend
//! confirms them. Nothing is updated optimistically.

use std::time::Duration;

use super::backend::BackendHttp;
use crate::cache::{QueryCache, QueryDefinition, Subscription, Tag};
use crate::error::{ApiError, ApiResult};
use crate::models::{CatchReceipt, CollectionPage, CollectionQuery, PokemonDetail, ReleaseReceipt};

/// Tag kind shared by collection lists and collection details
pub const COLLECTION_TAG: &str = "collection";

const LIST_ENDPOINT: &str = "collection.list";
const DETAIL_ENDPOINT: &str = "collection.detail";
const CATCH_ENDPOINT: &str = "collection.catch";
const RELEASE_ENDPOINT: &str = "collection.release";

pub fn list_tag() -> Tag {
    Tag::list(COLLECTION_TAG)
}

pub fn item_tag(id: u32) -> Tag {
    Tag::item(COLLECTION_TAG, id)
}

fn pokemon_path(id: u32) -> String {
    format!("pokemon/{}", id)
}

#[derive(Clone)]
pub struct CollectionClient {
    backend: BackendHttp,
    cache: QueryCache,
    list_keep_unused_for: Duration,
    detail_keep_unused_for: Duration,
}

impl CollectionClient {
    pub fn new(backend: BackendHttp, cache: QueryCache) -> Self {
        Self {
            backend,
            cache,
            list_keep_unused_for: Duration::from_secs(60),
            detail_keep_unused_for: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_keep_unused_for(mut self, list: Duration, detail: Duration) -> Self {
        self.list_keep_unused_for = list;
        self.detail_keep_unused_for = detail;
        self
    }

    /// One page of the collection. Ordering and filtering are applied by
    /// the backend and kept as received.
    pub fn list_mine(&self, query: &CollectionQuery) -> ApiResult<Subscription<CollectionPage>> {
        query.validate()?;

        let definition = QueryDefinition::new(LIST_ENDPOINT, query)?
            .keep_unused_for(self.list_keep_unused_for)
            .provides(|page: Option<&CollectionPage>| {
                let mut tags = vec![list_tag()];
                if let Some(page) = page {
                    tags.extend(page.items.iter().map(|p| item_tag(p.id)));
                }
                tags
            });

        let backend = self.backend.clone();
        let query = query.clone();
        self.cache.subscribe(definition, move || {
            let backend = backend.clone();
            let query = query.clone();
            async move {
                backend
                    .get_json_with_query::<CollectionPage, _>("pokemon", &query, "list collection")
                    .await
            }
        })
    }

    /// Personal record of one Pokémon. Fails with `NotFound` when it has
    /// not been caught; callers fall back to the catalog.
    pub fn get_detail(&self, id: u32) -> ApiResult<Subscription<PokemonDetail>> {
        let definition = QueryDefinition::new(DETAIL_ENDPOINT, &id)?
            .keep_unused_for(self.detail_keep_unused_for)
            .provides(move |_: Option<&PokemonDetail>| vec![item_tag(id)]);

        let backend = self.backend.clone();
        self.cache.subscribe(definition, move || {
            let backend = backend.clone();
            async move {
                backend
                    .get_json::<PokemonDetail>(&pokemon_path(id), "get collection pokemon")
                    .await
            }
        })
    }

    /// Persist `snapshot` as caught.
    pub async fn catch(&self, id: u32, snapshot: &PokemonDetail) -> ApiResult<CatchReceipt> {
        if snapshot.id != id {
            return Err(ApiError::Validation(format!(
                "snapshot is for pokemon {}, not {}",
                snapshot.id, id
            )));
        }

        let path = pokemon_path(id);
        let receipt: CatchReceipt = self
            .cache
            .mutate(
                CATCH_ENDPOINT,
                &[list_tag(), item_tag(id)],
                self.backend.put_json(&path, snapshot, "catch pokemon"),
            )
            .await?;
        log::info!("Caught {} (#{})", snapshot.name, receipt.id);
        Ok(receipt)
    }

    pub async fn release(&self, id: u32) -> ApiResult<ReleaseReceipt> {
        let path = pokemon_path(id);
        let receipt: ReleaseReceipt = self
            .cache
            .mutate(
                RELEASE_ENDPOINT,
                &[list_tag(), item_tag(id)],
                self.backend.delete_json(&path, "release pokemon"),
            )
            .await?;
        log::info!("Released #{}", receipt.id);
        Ok(receipt)
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
