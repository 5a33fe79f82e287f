//! Caller identity.
//!
//! Handlers take an [`Identity`] argument; the extractor pulls the bearer token from
//! the `Authorization` header and resolves it through the configured
//! [`IdentityProvider`].

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::AppState;
use crate::utils::error::AppError;

pub mod jwt;

pub use jwt::JwtIdentityProvider;

/// A verified user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingCredentials,

    #[error("token has expired")]
    ExpiredToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("failed to issue token: {0}")]
    TokenGeneration(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Result<Identity, AuthError>;
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingCredentials)?;
        let identity = state.identity.resolve(token).await?;
        tracing::debug!(user_id = %identity.user_id, "Resolved caller identity");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
