//! Authenticated HTTP access to the personal backend
//!
//! Every request reads the current session token and attaches it as a
//! bearer credential when present. A 401/403 answer clears the stored token
//! and, when a cache is attached, every cached entry.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::QueryCache;
use crate::error::{ApiError, ApiResult};
use crate::http::{ensure_success, join_url, read_json};
use crate::session::SessionStore;

#[derive(Clone)]
pub struct BackendHttp {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    cache: Option<QueryCache>,
}

impl BackendHttp {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            session,
            cache: None,
        }
    }

    /// Cache to tear down when the backend rejects the session.
    #[must_use]
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.public_request(method, path);
        match self.session.get() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Request without credentials (sign-in and registration).
    fn public_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, join_url(&self.base_url, path))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, operation: &str) -> ApiResult<T> {
        self.execute(self.request(Method::GET, path), operation).await
    }

    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q, operation: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.request(Method::GET, path).query(query), operation)
            .await
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B, operation: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.request(Method::PUT, path).json(body), operation)
            .await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str, operation: &str) -> ApiResult<T> {
        self.execute(self.request(Method::DELETE, path), operation)
            .await
    }

    /// POST without the bearer credential. A rejection here does not touch
    /// the stored session.
    pub async fn post_public<T, B>(&self, path: &str, body: &B, operation: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.public_request(Method::POST, path).json(body).send().await?;
        read_json(ensure_success(response, operation).await?).await
    }

    /// Like [`Self::post_public`] for endpoints whose body is not needed.
    pub async fn post_public_unit<B>(&self, path: &str, body: &B, operation: &str) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.public_request(Method::POST, path).json(body).send().await?;
        ensure_success(response, operation).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder, operation: &str) -> ApiResult<T> {
        let response = builder.send().await?;
        let response = self.check(response, operation).await?;
        read_json(response).await
    }

    async fn check(&self, response: reqwest::Response, operation: &str) -> ApiResult<reqwest::Response> {
        match ensure_success(response, operation).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_unauthorized() {
                    self.expire_session(&e);
                }
                Err(e)
            }
        }
    }

    fn expire_session(&self, cause: &ApiError) {
        if !self.session.is_authenticated() {
            return;
        }
        log::warn!("Session rejected by backend, signing out: {}", cause);
        if let Err(e) = self.session.clear() {
            log::warn!("Failed to remove session file: {}", e);
        }
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
