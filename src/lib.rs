//! Pokédex client
//!
//! Remote-data layer for a Pokédex: a shared query cache with tag-based
//! invalidation, a client for the public catalog, a client for the signed-in
//! user's collection on the personal backend, and the session token store.

pub mod api;
pub mod browser;
pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod formatters;
pub mod http;
pub mod models;
pub mod pokedex;
pub mod session;
pub mod utils;

pub use api::{AuthClient, CatalogClient, CollectionClient, Registration};
pub use browser::CollectionBrowser;
pub use cache::{QueryCache, Subscription, Tag};
pub use config::Config;
pub use detail::{resolve_detail, DetailSource, ResolvedDetail};
pub use error::{ApiError, ApiResult};
pub use models::{
    CaughtPokemon, CollectionPage, CollectionQuery, PokemonDetail, PokemonSummary, SortBy, SortDir,
};
pub use pokedex::Pokedex;
pub use session::{SessionStore, SessionToken};
pub use utils::extract_id_from_url;
