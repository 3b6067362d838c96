//! `docgate-core` — shared domain primitives (ids, errors, entity marker).
//!
//! No storage, transport or authorization concerns live here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, IngestionId, RoleId, UserId};
