//! Shared HTTP plumbing: client construction, status mapping, JSON decoding

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

pub const USER_AGENT: &str = "Pokedex/0.1";

/// Build the HTTP client shared by every API client.
pub fn build_client(timeout: Duration) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(Into::into)
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Checks the response status and maps failures onto the error taxonomy.
pub async fn ensure_success(response: Response, operation: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let details = response.text().await.unwrap_or_default();
    log::debug!("{} failed with status {}: {}", operation, status, details);
    Err(status_error(status, operation, details))
}

pub(crate) fn status_error(status: StatusCode, operation: &str, details: String) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Unauthorized(format!("{} rejected ({})", operation, status))
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(operation.to_string()),
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            details,
        },
        s => ApiError::HttpStatus {
            status: s.as_u16(),
            details,
        },
    }
}

/// Reads the body as text and parses it, so malformed JSON surfaces as
/// [`ApiError::Parse`] rather than a transport error.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://h/api/", "/pokemon"), "http://h/api/pokemon");
        assert_eq!(join_url("http://h/api", "pokemon/25"), "http://h/api/pokemon/25");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "list", String::new()),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "list", String::new()),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "detail", String::new()),
            ApiError::NotFound(_)
        ));
        match status_error(StatusCode::BAD_GATEWAY, "list", "upstream".into()) {
            ApiError::Server { status, details } => {
                assert_eq!(status, 502);
                assert_eq!(details, "upstream");
            }
            other => panic!("Expected ApiError::Server, got: {other:?}"),
        }
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "catch", String::new()),
            ApiError::HttpStatus { status: 409, .. }
        ));
    }
}
