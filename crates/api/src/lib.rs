//! HTTP host: configuration, authentication, the per-route authorization
//! gate, and the user/document/ingestion routes.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
