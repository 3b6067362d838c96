use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

use docgate_auth::ConfigError;
use docgate_core::{DocumentId, IngestionId};

use crate::app::dto;
use crate::app::services::{AppServices, ServiceError};
use crate::authz::{Access, operation};
use crate::context::PrincipalContext;

pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route(
            "/ingestion",
            operation(Method::POST, "ingestion.create", Access::Default, create_ingestion)?
                .merge(operation(Method::GET, "ingestion.list", Access::Default, list_ingestions)?),
        )
        .route(
            "/ingestion/:id",
            operation(Method::GET, "ingestion.get", Access::Default, get_ingestion)?,
        ))
}

/// Hand the document to the ingestion worker on behalf of the caller.
pub async fn create_ingestion(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateIngestionRequest>,
) -> Result<Response, ServiceError> {
    let document_id: DocumentId = body.document_id.parse()?;
    let ingestion = services
        .start_ingestion(document_id, principal.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(ingestion)).into_response())
}

pub async fn list_ingestions(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ServiceError> {
    let items = services.list_ingestions().await?;
    Ok(Json(serde_json::json!({ "items": items })).into_response())
}

pub async fn get_ingestion(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id: IngestionId = id.parse()?;
    Ok(Json(services.get_ingestion(id).await?).into_response())
}
