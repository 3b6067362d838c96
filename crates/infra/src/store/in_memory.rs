use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use docgate_core::Entity;

/// Result of a conditional in-place update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<V> {
    Updated(V),
    Missing,
    Conflict,
}

impl<V> Update<V> {
    pub fn updated(self) -> Option<V> {
        match self {
            Update::Updated(v) => Some(v),
            Update::Missing | Update::Conflict => None,
        }
    }
}

/// Keyed entity store.
pub trait Store<V: Entity>: Send + Sync {
    fn get(&self, id: &V::Id) -> Option<V>;
    fn upsert(&self, value: V);
    fn remove(&self, id: &V::Id) -> Option<V>;
    /// All entities, ordered by id.
    fn list(&self) -> Vec<V>;
    /// Insert or replace `value` unless another entity satisfies `conflicts`.
    ///
    /// The check and the write happen under one lock. Returns `false` when a
    /// conflicting entity exists (nothing is written).
    fn upsert_unless(&self, value: V, conflicts: &dyn Fn(&V) -> bool) -> bool;
    /// Apply `change` to the stored entity in place.
    ///
    /// Read, change, conflict check and write happen under one lock, so a
    /// concurrent removal is never undone and fields `change` leaves alone
    /// are never written back stale. `conflicts(updated, other)` is checked
    /// against every other entity; on a conflict nothing is written.
    fn update_unless(
        &self,
        id: &V::Id,
        change: &mut dyn FnMut(&mut V),
        conflicts: &dyn Fn(&V, &V) -> bool,
    ) -> Update<V>;

    /// [`Store::update_unless`] without a uniqueness constraint. `None` when
    /// the entity does not exist.
    fn update(&self, id: &V::Id, change: &mut dyn FnMut(&mut V)) -> Option<V> {
        self.update_unless(id, change, &|_, _| false).updated()
    }
}

impl<V, S> Store<V> for Arc<S>
where
    V: Entity,
    S: Store<V> + ?Sized,
{
    fn get(&self, id: &V::Id) -> Option<V> {
        (**self).get(id)
    }

    fn upsert(&self, value: V) {
        (**self).upsert(value)
    }

    fn remove(&self, id: &V::Id) -> Option<V> {
        (**self).remove(id)
    }

    fn list(&self) -> Vec<V> {
        (**self).list()
    }

    fn upsert_unless(&self, value: V, conflicts: &dyn Fn(&V) -> bool) -> bool {
        (**self).upsert_unless(value, conflicts)
    }

    fn update_unless(
        &self,
        id: &V::Id,
        change: &mut dyn FnMut(&mut V),
        conflicts: &dyn Fn(&V, &V) -> bool,
    ) -> Update<V> {
        (**self).update_unless(id, change, conflicts)
    }
}

/// In-memory store for tests/dev.
///
/// A poisoned lock is recovered rather than propagated: every write is a
/// single map operation, so the map is never left half-updated.
#[derive(Debug)]
pub struct InMemoryStore<V: Entity> {
    inner: RwLock<HashMap<V::Id, V>>,
}

impl<V: Entity> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// First entity matching `predicate`, in id order.
    pub fn find(&self, predicate: impl Fn(&V) -> bool) -> Option<V>
    where
        V: Clone,
    {
        self.read()
            .values()
            .filter(|v| predicate(v))
            .min_by_key(|v| v.id())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<V::Id, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<V::Id, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Entity> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Store<V> for InMemoryStore<V>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Send + Sync,
{
    fn get(&self, id: &V::Id) -> Option<V> {
        self.read().get(id).cloned()
    }

    fn upsert(&self, value: V) {
        self.write().insert(value.id(), value);
    }

    fn remove(&self, id: &V::Id) -> Option<V> {
        self.write().remove(id)
    }

    fn list(&self) -> Vec<V> {
        let mut items: Vec<V> = self.read().values().cloned().collect();
        items.sort_by_key(|v| v.id());
        items
    }

    fn upsert_unless(&self, value: V, conflicts: &dyn Fn(&V) -> bool) -> bool {
        let mut map = self.write();

        let id = value.id();
        if map.values().any(|existing| existing.id() != id && conflicts(existing)) {
            return false;
        }
        map.insert(id, value);
        true
    }

    fn update_unless(
        &self,
        id: &V::Id,
        change: &mut dyn FnMut(&mut V),
        conflicts: &dyn Fn(&V, &V) -> bool,
    ) -> Update<V> {
        let mut map = self.write();

        let Some(mut updated) = map.get(id).cloned() else {
            return Update::Missing;
        };
        change(&mut updated);

        if map
            .values()
            .any(|other| other.id() != *id && conflicts(&updated, other))
        {
            return Update::Conflict;
        }
        map.insert(*id, updated.clone());
        Update::Updated(updated)
    }
}

#[cfg(test)]
mod tests {
    use docgate_core::DocumentId;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: DocumentId,
        title: String,
    }

    impl Entity for Note {
        type Id = DocumentId;

        fn id(&self) -> DocumentId {
            self.id
        }
    }

    fn note(title: &str) -> Note {
        Note {
            id: DocumentId::new(),
            title: title.to_string(),
        }
    }

    #[test]
    fn upsert_get_remove() {
        let store = InMemoryStore::<Note>::new();
        let n = note("a");
        store.upsert(n.clone());

        assert_eq!(store.get(&n.id), Some(n.clone()));
        assert_eq!(store.remove(&n.id), Some(n.clone()));
        assert_eq!(store.get(&n.id), None);
    }

    #[test]
    fn list_is_ordered_by_id() {
        let store = InMemoryStore::<Note>::new();
        let mut notes: Vec<Note> = (0..5).map(|i| note(&i.to_string())).collect();
        for n in notes.iter().rev() {
            store.upsert(n.clone());
        }
        notes.sort_by_key(|n| n.id);
        assert_eq!(store.list(), notes);
    }

    #[test]
    fn upsert_unless_blocks_conflicts_but_allows_self_update() {
        let store = InMemoryStore::<Note>::new();
        let a = note("same");
        assert!(store.upsert_unless(a.clone(), &|e: &Note| e.title == "same"));

        let b = note("same");
        assert!(!store.upsert_unless(b.clone(), &|e: &Note| e.title == b.title));
        assert_eq!(store.len(), 1);

        let renamed = Note {
            title: "same".into(),
            ..a.clone()
        };
        assert!(store.upsert_unless(renamed, &|e: &Note| e.title == "same"));
    }

    #[test]
    fn update_changes_in_place_and_never_resurrects() {
        let store = InMemoryStore::<Note>::new();
        let n = note("draft");
        store.upsert(n.clone());

        let updated = store.update(&n.id, &mut |v: &mut Note| v.title = "final".into());
        assert_eq!(updated.map(|v| v.title), Some("final".to_string()));

        store.remove(&n.id);
        assert_eq!(store.update(&n.id, &mut |v: &mut Note| v.title = "again".into()), None);
        assert!(store.is_empty());
    }

    #[test]
    fn update_unless_rejects_conflicts_without_writing() {
        let store = InMemoryStore::<Note>::new();
        let a = note("a");
        let b = note("b");
        store.upsert(a.clone());
        store.upsert(b.clone());

        let same_title = |updated: &Note, other: &Note| updated.title == other.title;
        assert_eq!(
            store.update_unless(&a.id, &mut |v: &mut Note| v.title = "b".into(), &same_title),
            Update::Conflict
        );
        assert_eq!(store.get(&a.id), Some(a.clone()));

        assert_eq!(
            store.update_unless(&a.id, &mut |v: &mut Note| v.title = "a".into(), &same_title),
            Update::Updated(a.clone())
        );
        assert_eq!(
            store.update_unless(&DocumentId::new(), &mut |_: &mut Note| {}, &same_title),
            Update::Missing
        );
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let store = Arc::new(InMemoryStore::<Note>::new());
        let n = note("kept");
        store.upsert(n.clone());

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(store.inner.is_poisoned());

        let later = note("later");
        store.upsert(later.clone());
        assert_eq!(store.get(&n.id), Some(n));
        assert_eq!(store.get(&later.id), Some(later));
        assert!(!store.upsert_unless(note("kept"), &|e: &Note| e.title == "kept"));
    }

    #[test]
    fn find_returns_first_match() {
        let store = InMemoryStore::<Note>::new();
        let first = note("hit");
        store.upsert(first.clone());
        store.upsert(note("hit"));
        store.upsert(note("miss"));

        assert_eq!(store.find(|n| n.title == "hit"), Some(first));
        assert_eq!(store.find(|n| n.title == "none"), None);
    }
}
