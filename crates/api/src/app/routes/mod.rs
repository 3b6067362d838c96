use axum::Router;

use docgate_auth::ConfigError;

pub mod auth;
pub mod documents;
pub mod ingestion;
pub mod system;
pub mod users;

/// Every route, each behind its own authorization gate.
///
/// Fails on the first malformed operation declaration.
pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .merge(system::router()?)
        .merge(auth::router()?)
        .merge(users::router()?)
        .merge(documents::router()?)
        .merge(ingestion::router()?))
}
