//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: stores, file storage, token issuing, ingestion client
//! - `routes/`: HTTP routes + handlers, one file per resource
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use docgate_auth::{Hs256JwtIssuer, Hs256JwtValidator, PasswordHasher};
use docgate_infra::{
    FileStorage, InMemoryStore, Ingestion, IngestionWorker, IngestionWorkerConfig,
    IngestionWorkerHandle,
};

use crate::config::Config;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// A built application: the router plus the background worker it talks to.
pub struct App {
    pub router: Router,
    pub ingestion_worker: IngestionWorkerHandle,
}

/// Build the full HTTP application (public entrypoint used by `main.rs`).
///
/// Seeds default roles and the admin account, starts the ingestion worker on
/// the current runtime, and registers every route behind its gate. Any
/// malformed route declaration fails here, before the server binds.
pub async fn build_app(config: &Config) -> anyhow::Result<App> {
    let worker_config = IngestionWorkerConfig::default()
        .with_completion_delay(config.ingestion_delay)
        .with_success_rate(config.ingestion_success_rate);
    let (ingestion, ingestion_worker) =
        IngestionWorker::new(Arc::new(InMemoryStore::<Ingestion>::new()), worker_config).spawn();

    let services = Arc::new(services::AppServices::new(
        FileStorage::new(config.upload_dir.clone()),
        Arc::new(ingestion),
        Arc::new(Hs256JwtIssuer::new(config.jwt_secret.as_bytes())),
        config.jwt_ttl,
        PasswordHasher::new(config.bcrypt_cost)?,
    ));
    services.bootstrap(&config.admin)?;

    let auth_state = middleware::AuthState {
        jwt: Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes())),
        services: services.clone(),
    };

    // Outermost first: services, then principal resolution, then the
    // per-route gate registered inside `routes::router`.
    let router = routes::router()?.layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::authenticate,
            )),
    );

    Ok(App {
        router,
        ingestion_worker,
    })
}
