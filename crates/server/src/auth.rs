//! Session authentication against the external identity service.
//!
//! The identity service itself is out of process; what arrives here is the
//! bearer token it minted. [`IdentityProvider`] is the seam, [`JwtIdentity`]
//! the shipped implementation, and [`AuthUser`] the extractor that rejects
//! unauthenticated requests before any handler logic runs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// "Is this request authenticated, and as whom?"
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user id, or `None` if it is not valid.
    async fn authenticate(&self, token: &str) -> Option<String>;
}

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The user id.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Validates HS256 session tokens signed with the shared session secret.
pub struct JwtIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentity {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentity {
    async fn authenticate(&self, token: &str) -> Option<String> {
        match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                None
            }
        }
    }
}

/// The authenticated caller's user id.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        state
            .identity
            .authenticate(token)
            .await
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}
