use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

use docgate_auth::ConfigError;
use docgate_core::{DocumentId, DomainError};

use crate::app::dto::{self, UploadedFile};
use crate::app::services::{AppServices, ServiceError};
use crate::authz::{Access, operation};

/// Upload size cap for document bodies.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route(
            "/document/upload",
            operation(Method::POST, "document.upload", Access::Default, upload_document)?,
        )
        .route(
            "/document",
            operation(Method::GET, "document.list", Access::Default, list_documents)?.merge(
                operation(
                    Method::DELETE,
                    "document.purge",
                    Access::Rules(&["manage:document"]),
                    purge_documents,
                )?,
            ),
        )
        .route(
            "/document/:id",
            operation(Method::GET, "document.get", Access::Default, get_document)?
                .merge(operation(
                    Method::PATCH,
                    "document.update",
                    Access::Default,
                    replace_document,
                )?)
                .merge(operation(
                    Method::DELETE,
                    "document.delete",
                    Access::Default,
                    delete_document,
                )?),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
}

/// Pull the `file` field out of a multipart body.
async fn read_file(mut multipart: Multipart) -> Result<UploadedFile, ServiceError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        DomainError::validation(format!("invalid multipart body: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(invalid)?;

        return Ok(UploadedFile {
            name,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(DomainError::validation("multipart field `file` is required").into())
}

pub async fn upload_document(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let file = read_file(multipart).await?;
    let document = services.upload_document(file).await?;
    Ok((StatusCode::CREATED, Json(document)).into_response())
}

pub async fn list_documents(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let items = services.list_documents();
    Json(serde_json::json!({ "items": items })).into_response()
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id: DocumentId = id.parse()?;
    Ok(Json(services.get_document(id)?).into_response())
}

pub async fn replace_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let id: DocumentId = id.parse()?;
    let file = read_file(multipart).await?;
    Ok(Json(services.replace_document(id, file).await?).into_response())
}

pub async fn delete_document(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id: DocumentId = id.parse()?;
    Ok(Json(services.delete_document(id).await?).into_response())
}

pub async fn purge_documents(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ServiceError> {
    let deleted = services.purge_documents().await?;
    Ok(Json(dto::PurgeResponse { deleted }).into_response())
}
