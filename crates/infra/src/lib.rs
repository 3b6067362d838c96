//! `docgate-infra` — storage and background work behind the API.
//!
//! Everything here is in-memory or local-disk; the authorization core never
//! depends on this crate.

pub mod documents;
pub mod ingestion;
pub mod roles;
pub mod store;
pub mod users;

pub use documents::{Document, FileStorage, FileStorageError, extension_of};
pub use ingestion::{
    ChannelIngestionClient, Ingestion, IngestionClient, IngestionError, IngestionStatus,
    IngestionWorker, IngestionWorkerConfig, IngestionWorkerHandle,
};
pub use roles::InMemoryRoleStore;
pub use store::{InMemoryStore, Store, Update};
pub use users::{User, UserStore, normalize_email};
