use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};

use super::token::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Claims of a verified application token, taken from `Authorization: Bearer <token>`.
///
/// A missing header or token is rejected with 401, anything that fails
/// verification with 403. Neither touches the store.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

/// The token part of an `Authorization` header value (the second word).
pub(crate) fn bearer_token(value: &str) -> Option<&str> {
    value.split_whitespace().nth(1)
}

impl<S> FromRequestParts<S> for Authenticated
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::TokenRequired)?;

        let state = AppState::from_ref(state);
        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected application token");
            ApiError::InvalidToken
        })?;

        Ok(Authenticated(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token(""), None);
    }
}
