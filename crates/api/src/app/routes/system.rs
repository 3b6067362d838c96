use axum::{Router, http::Method, http::StatusCode};

use docgate_auth::ConfigError;

use crate::authz::{Access, operation};

pub fn router() -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route("/", operation(Method::GET, "app.hello", Access::Public, hello)?)
        .route("/health", operation(Method::GET, "app.health", Access::Public, health)?))
}

pub async fn hello() -> &'static str {
    "Hello World!"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
