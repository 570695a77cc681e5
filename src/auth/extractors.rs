use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::{Identity, JwtKeys, TokenError};
use crate::error::AppError;

/// Verified caller identity. Taking this as a handler argument makes the
/// route require `Authorization: Bearer <token>`.
///
/// The claims are trusted as-is; the user record is not re-read.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized("No token provided"))?;

        let keys = JwtKeys::from_ref(state);
        match keys.verify(token) {
            Ok(identity) => Ok(AuthUser(identity)),
            Err(TokenError::Expired) => {
                warn!("expired token");
                Err(AppError::Unauthorized("Invalid token"))
            }
            Err(TokenError::Invalid(reason)) => {
                warn!(%reason, "invalid token");
                Err(AppError::Unauthorized("Invalid token"))
            }
        }
    }
}
