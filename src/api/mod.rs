pub mod auth;
pub mod backend;
pub mod catalog;
pub mod collection;

pub use auth::{AuthClient, Registration};
pub use backend::BackendHttp;
pub use catalog::CatalogClient;
pub use collection::CollectionClient;
