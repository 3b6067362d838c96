//! Delegated ingestion jobs.
//!
//! The API never touches ingestion records directly: it talks to the worker
//! through an [`IngestionClient`], mirroring a request/reply message queue.

pub mod types;
pub mod worker;

pub use types::{Ingestion, IngestionStatus};
pub use worker::{
    ChannelIngestionClient, IngestionClient, IngestionError, IngestionWorker,
    IngestionWorkerConfig, IngestionWorkerHandle,
};
