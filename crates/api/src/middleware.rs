use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use docgate_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<AppServices>,
}

/// Credentials were presented but could not be used.
///
/// Recorded on the request instead of answered here: the per-route gate
/// turns it into a 401 on guarded operations and ignores it on public ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedCredentials(pub &'static str);

impl IntoResponse for RejectedCredentials {
    fn into_response(self) -> Response {
        json_error(StatusCode::UNAUTHORIZED, "unauthorized", self.0)
    }
}

/// Resolve the request principal from an optional bearer token.
///
/// No `Authorization` header: the request continues without a principal and
/// the per-route gate decides. A header that is present but unusable, or a
/// token for a user that no longer exists, continues with
/// [`RejectedCredentials`] instead of a principal.
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    match resolve(&state, req.headers()) {
        Ok(Some(principal)) => {
            req.extensions_mut().insert(principal);
        }
        Ok(None) => {}
        Err(rejected) => {
            req.extensions_mut().insert(rejected);
        }
    }
    next.run(req).await
}

fn resolve(state: &AuthState, headers: &HeaderMap) -> Result<Option<PrincipalContext>, RejectedCredentials> {
    let Some(token) = extract_bearer(headers).map_err(RejectedCredentials)? else {
        return Ok(None);
    };

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        RejectedCredentials("invalid or expired token")
    })?;

    match state.services.resolve_principal(claims.sub.into()) {
        Some(principal) => Ok(Some(principal)),
        None => {
            tracing::debug!(principal_id = %claims.sub, "token subject no longer exists");
            Err(RejectedCredentials("invalid or expired token"))
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| "malformed authorization header")?;

    let (scheme, token) = header
        .trim_start()
        .split_once(' ')
        .ok_or("authorization header must use the Bearer scheme")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("authorization header must use the Bearer scheme");
    }
    let token = token.trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(Some(token))
}
