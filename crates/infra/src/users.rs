//! User accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docgate_auth::RoleName;
use docgate_core::{DomainError, DomainResult, Entity, UserId};

use crate::store::{InMemoryStore, Store, Update};

/// A stored user account.
///
/// `password_hash` never leaves the service layer; API responses use a
/// separate view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleName,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Trim and lowercase an email, rejecting anything that is not
/// `local@domain.tld` shaped.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email must be a valid email address"));
    }
    Ok(email)
}

/// User storage with unique, case-insensitive emails.
#[derive(Debug, Default)]
pub struct UserStore {
    users: InMemoryStore<User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user, rejecting an email another user already owns.
    pub fn save(&self, user: User) -> DomainResult<User> {
        let email = user.email.to_lowercase();
        let saved = user.clone();
        if self
            .users
            .upsert_unless(user, &|existing: &User| existing.email.to_lowercase() == email)
        {
            Ok(saved)
        } else {
            Err(DomainError::conflict("Email already exists"))
        }
    }

    /// Change a stored user in place. Fields `change` does not touch keep
    /// their current value, and a user removed meanwhile stays removed.
    pub fn update(&self, id: &UserId, mut change: impl FnMut(&mut User)) -> DomainResult<User> {
        let same_email =
            |updated: &User, other: &User| other.email.to_lowercase() == updated.email.to_lowercase();
        match self.users.update_unless(id, &mut change, &same_email) {
            Update::Updated(user) => Ok(user),
            Update::Missing => Err(DomainError::not_found("user")),
            Update::Conflict => Err(DomainError::conflict("Email already exists")),
        }
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users.get(id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.to_lowercase();
        self.users.find(|u| u.email.to_lowercase() == email)
    }

    pub fn list(&self) -> Vec<User> {
        self.users.list()
    }

    pub fn remove(&self, id: &UserId) -> DomainResult<User> {
        self.users.remove(id).ok_or(DomainError::not_found("user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: "Test".into(),
            email: email.into(),
            password_hash: "x".into(),
            role: RoleName::VIEWER,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn emails_are_normalized_or_rejected() {
        assert_eq!(normalize_email("  Admin@Example.COM ").unwrap(), "admin@example.com");
        for bad in ["", "admin", "admin@localhost", "@example.com", "a@.com", "a@example.", "a b@example.com"] {
            assert!(normalize_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn email_is_unique_ignoring_case() {
        let store = UserStore::new();
        store.save(user("a@example.com")).unwrap();

        let err = store.save(user("A@Example.com")).unwrap_err();
        assert_eq!(err, DomainError::conflict("Email already exists"));
    }

    #[test]
    fn updating_self_keeps_email() {
        let store = UserStore::new();
        let u = store.save(user("a@example.com")).unwrap();

        let renamed = store.update(&u.id, |u| u.name = "Renamed".into()).unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(store.find_by_email("A@EXAMPLE.COM").unwrap().id, u.id);
    }

    #[test]
    fn update_rejects_taken_email_and_missing_user() {
        let store = UserStore::new();
        let a = store.save(user("a@example.com")).unwrap();
        store.save(user("b@example.com")).unwrap();

        let err = store.update(&a.id, |u| u.email = "B@example.com".into()).unwrap_err();
        assert_eq!(err, DomainError::conflict("Email already exists"));
        assert_eq!(store.get(&a.id).unwrap().email, "a@example.com");

        store.remove(&a.id).unwrap();
        let err = store.update(&a.id, |u| u.name = "Ghost".into()).unwrap_err();
        assert_eq!(err, DomainError::not_found("user"));
        assert!(store.get(&a.id).is_none());
    }

    #[test]
    fn field_updates_do_not_overwrite_each_other() {
        let store = UserStore::new();
        let u = store.save(user("a@example.com")).unwrap();

        store.update(&u.id, |u| u.role = RoleName::ADMIN).unwrap();
        store.update(&u.id, |u| u.name = "Renamed".into()).unwrap();

        let current = store.get(&u.id).unwrap();
        assert_eq!(current.role, RoleName::ADMIN);
        assert_eq!(current.name, "Renamed");
    }

    #[test]
    fn remove_missing_user_is_not_found() {
        let store = UserStore::new();
        assert_eq!(store.remove(&UserId::new()), Err(DomainError::not_found("user")));
    }
}
