use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::data_models::Author;
use crate::error::AppError;

pub const USER_EMAIL: &str = "x-user-email";
pub const USER_NAME: &str = "x-user-name";
pub const USER_IMAGE: &str = "x-user-image";

/// The caller, as asserted by the upstream session provider.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Author);

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = header(parts, USER_EMAIL).ok_or(AppError::Unauthenticated)?;
        let name = header(parts, USER_NAME).unwrap_or_else(|| email.clone());
        let image = header(parts, USER_IMAGE).unwrap_or_default();
        Ok(AuthUser(Author {
            email: email.to_lowercase(),
            name,
            image,
        }))
    }
}
