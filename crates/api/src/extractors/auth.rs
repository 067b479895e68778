use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use convo_services::auth::AuthContext;
use tracing::warn;

use crate::state::AppState;

/// Caller identity from an `Authorization: Bearer` token.
///
/// Never rejects: a missing or unverifiable token yields `Caller(None)` and
/// the function decides what an anonymous call means.
pub struct Caller(pub Option<AuthContext>);

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Caller(None));
        };

        let Some(token) = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
        else {
            warn!("Ignoring malformed Authorization header");
            return Ok(Caller(None));
        };

        match state.auth.verify(token) {
            Ok(context) => Ok(Caller(Some(context))),
            Err(e) => {
                warn!(%e, "Ignoring unverifiable caller token");
                Ok(Caller(None))
            }
        }
    }
}
