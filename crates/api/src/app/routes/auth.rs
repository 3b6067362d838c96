use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Extension, Json, Router, http::Method, response::IntoResponse, response::Response};

use docgate_auth::{ConfigError, Subject, build_ability};

use crate::app::dto;
use crate::app::services::{AppServices, ServiceError};
use crate::authz::{Access, operation};
use crate::context::PrincipalContext;

pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route("/auth/login", operation(Method::POST, "auth.login", Access::Public, login)?)
        .route("/auth/logout", operation(Method::POST, "auth.logout", Access::Default, logout)?)
        .route("/auth/me", operation(Method::GET, "auth.me", Access::Default, me)?))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Result<Response, ServiceError> {
    let session = services.login(&body.email, &body.password)?;
    Ok(Json(session).into_response())
}

/// Tokens are stateless; logging out only confirms who the caller was.
pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> Response {
    tracing::info!(principal_id = %principal.principal_id(), "logout");
    Json(serde_json::json!({
        "message": "Logged out",
        "user_id": principal.principal_id().to_string(),
        "email": principal.email(),
    }))
    .into_response()
}

/// The caller, its raw permissions, and what they allow on each subject.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ServiceError> {
    let user = services.get_user(principal.user_id())?;
    let ability = build_ability(principal.principal());
    let capabilities: BTreeMap<_, _> = Subject::ALL
        .into_iter()
        .map(|subject| (subject.as_str(), ability.permitted_actions(subject)))
        .collect();

    Ok(Json(serde_json::json!({
        "user": user,
        "permissions": principal.principal().permissions(),
        "capabilities": capabilities,
    }))
    .into_response())
}
