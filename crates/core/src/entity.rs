//! Entity trait: identity that survives updates.

/// Anything persisted by id (users, roles, documents, ingestion jobs).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
