//! Sign-in, registration and sign-out against the personal backend

use serde::{Deserialize, Serialize};

use super::backend::BackendHttp;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionToken;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegistrationBody<'a> {
    email: &'a str,
    password: &'a str,
    username: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Sign-up form contents.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
}

impl Registration {
    /// Checks the form before anything is sent.
    pub fn validate(&self) -> ApiResult<()> {
        require_credentials(&self.email, &self.password)?;
        if self.username.trim().is_empty() {
            return Err(ApiError::Validation("username is required".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::Validation("passwords do not match".to_string()));
        }
        Ok(())
    }
}

fn require_credentials(email: &str, password: &str) -> ApiResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "please enter a valid email and password".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthClient {
    backend: BackendHttp,
}

impl AuthClient {
    pub fn new(backend: BackendHttp) -> Self {
        Self { backend }
    }

    /// Exchange credentials for a token and store it.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionToken> {
        require_credentials(email, password)?;

        let body = Credentials {
            email: email.trim(),
            password,
        };
        let response: LoginResponse = self.backend.post_public("user/login", &body, "login").await?;
        if response.token.is_empty() {
            return Err(ApiError::Unauthorized("login returned an empty token".to_string()));
        }

        let token = SessionToken::new(response.token);
        self.backend.session().set(token.clone())?;
        log::info!("Signed in as {}", body.email);
        Ok(token)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        registration.validate()?;

        let body = RegistrationBody {
            email: registration.email.trim(),
            password: &registration.password,
            username: registration.username.trim(),
        };
        self.backend
            .post_public_unit("user/registration", &body, "registration")
            .await?;
        log::info!("Registered {}", body.email);
        Ok(())
    }

    /// Forget the stored token.
    pub fn logout(&self) -> ApiResult<()> {
        self.backend.session().clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.backend.session().is_authenticated()
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
