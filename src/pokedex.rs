//! Application context: one cache, one session and the clients sharing them.

use std::sync::Arc;

use crate::api::{AuthClient, BackendHttp, CatalogClient, CollectionClient, Registration};
use crate::cache::{CacheConfig, QueryCache};
use crate::config::Config;
use crate::detail::{load_detail, ResolvedDetail};
use crate::error::ApiResult;
use crate::http::build_client;
use crate::models::CatchReceipt;
use crate::session::{SessionStore, SessionToken};

pub struct Pokedex {
    cache: QueryCache,
    session: Arc<SessionStore>,
    auth: AuthClient,
    catalog: CatalogClient,
    collection: CollectionClient,
}

impl Pokedex {
    /// Build the context, restoring the session from disk when a session
    /// path is configured.
    pub fn new(config: &Config) -> ApiResult<Self> {
        let session = match &config.session_path {
            Some(path) => SessionStore::load(path),
            None => SessionStore::in_memory(),
        };
        Self::with_session(config, Arc::new(session))
    }

    pub fn with_session(config: &Config, session: Arc<SessionStore>) -> ApiResult<Self> {
        let http = build_client(config.request_timeout)?;
        let cache = QueryCache::new(CacheConfig {
            keep_unused_for: config.default_keep_unused_for,
        });

        let backend = BackendHttp::new(http.clone(), config.backend_url.clone(), session.clone())
            .with_cache(cache.clone());
        let catalog = CatalogClient::new(http, config.catalog_url.clone(), cache.clone())
            .with_keep_unused_for(config.catalog_keep_unused_for);
        let collection = CollectionClient::new(backend.clone(), cache.clone()).with_keep_unused_for(
            config.collection_list_keep_unused_for,
            config.collection_detail_keep_unused_for,
        );

        log::debug!(
            "Pokedex ready (backend {}, catalog {})",
            config.backend_url,
            config.catalog_url
        );

        Ok(Self {
            cache,
            session,
            auth: AuthClient::new(backend),
            catalog,
            collection,
        })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn collection(&self) -> &CollectionClient {
        &self.collection
    }

    /// Token presence is what gates the personal views.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionToken> {
        let token = self.auth.login(email, password).await?;
        // Drop entries fetched under a previous session
        self.cache.clear();
        Ok(token)
    }

    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        self.auth.register(registration).await
    }

    /// Sign out and drop every cached entry.
    pub fn logout(&self) -> ApiResult<()> {
        self.auth.logout()?;
        self.cache.clear();
        log::info!("Signed out");
        Ok(())
    }

    /// Catch `id` using the catalog record as the stored snapshot.
    pub async fn catch_by_id(&self, id: u32) -> ApiResult<CatchReceipt> {
        let snapshot = self.catalog.get_by_id(id)?.data().await?;
        self.collection.catch(id, &snapshot).await
    }

    /// Personal record when caught (and signed in), else the catalog one.
    pub async fn resolve_detail(&self, id: u32) -> ApiResult<ResolvedDetail> {
        let collection = self.is_authenticated().then_some(&self.collection);
        load_detail(collection, &self.catalog, id).await
    }
}

#[cfg(test)]
#[path = "pokedex_tests.rs"]
mod tests;
