use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;

use crate::http_error::AppError;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// HS256 signing secret, installed on routers as a request extension.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// The authenticated caller, taken from a `Bearer` token whose subject is the user id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_hdr = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "missing authorization").with_code("missing_token"))?;

        let token = auth_hdr
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "invalid authorization header").with_code("invalid_token"))?;

        let secret = match parts.extensions.get::<JwtSecret>() {
            Some(JwtSecret(s)) => s.clone(),
            None => env::var("JWT_SECRET").map_err(|_| {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "jwtSecretNotConfigured").with_code("config_error")
            })?,
        };

        let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
            .map_err(|_| AppError::new(StatusCode::UNAUTHORIZED, "invalid token").with_code("invalid_token"))?;
        let user_id = token_data
            .claims
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "invalid token subject").with_code("invalid_token"))?;
        Ok(AuthUser { user_id })
    }
}

/// Signs a token for `user_id`, valid for `ttl`.
pub fn issue_token(secret: &str, user_id: i64, ttl: chrono::Duration) -> Result<String, AppError> {
    let exp = (chrono::Utc::now() + ttl).timestamp() as usize;
    let claims = Claims { sub: user_id.to_string(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
