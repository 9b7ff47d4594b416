//! Remote resource cache: keyed query entries, subscriptions and
//! tag-based invalidation

pub mod key;
pub mod query_cache;
pub mod state;
pub mod tags;

pub use key::QueryKey;
pub use query_cache::{CacheConfig, CacheStats, QueryCache, QueryDefinition, Subscription};
pub use state::{FetchStatus, QueryState};
pub use tags::{Tag, TagId};
