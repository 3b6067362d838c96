use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

use docgate_auth::ConfigError;
use docgate_core::UserId;

use crate::app::dto;
use crate::app::services::{AppServices, ServiceError};
use crate::authz::{Access, operation};

pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route(
            "/user/register",
            operation(Method::POST, "user.register", Access::Default, register_user)?,
        )
        .route("/user", operation(Method::GET, "user.list", Access::Default, list_users)?)
        .route(
            "/user/:id",
            operation(Method::GET, "user.get", Access::Default, get_user)?
                .merge(operation(Method::PATCH, "user.update", Access::Default, update_user)?)
                .merge(operation(Method::DELETE, "user.delete", Access::Default, delete_user)?),
        )
        .route(
            "/user/:id/role",
            operation(
                Method::PUT,
                "user.assign_role",
                Access::Rules(&["manage:user"]),
                assign_role,
            )?,
        ))
}

pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterUserRequest>,
) -> Result<Response, ServiceError> {
    let user = services.register_user(body)?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let items = services.list_users();
    Json(serde_json::json!({ "items": items })).into_response()
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id: UserId = id.parse()?;
    Ok(Json(services.get_user(id)?).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> Result<Response, ServiceError> {
    let id: UserId = id.parse()?;
    Ok(Json(services.update_user(id, body)?).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id: UserId = id.parse()?;
    Ok(Json(services.delete_user(id)?).into_response())
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> Result<Response, ServiceError> {
    let id: UserId = id.parse()?;
    Ok(Json(services.assign_role(id, &body.role)?).into_response())
}
