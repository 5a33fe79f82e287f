use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Identity, IdentityProvider};

const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies HS256 tokens signed by the identity service.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
        }
    }

    /// Sign a token for `identity`, valid for `ttl`.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id.clone(),
            name: Some(identity.display_name.clone()),
            email: Some(identity.email.clone()),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, bearer: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(bearer, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("token carries no user id".to_string()));
        }

        Ok(Identity {
            user_id: claims.sub,
            display_name: claims
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            email: claims.email.unwrap_or_default(),
        })
    }
}
