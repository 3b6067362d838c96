use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use docgate_core::{Entity, RoleId};

use crate::{ConfigError, Permission};

/// Role name used for RBAC assignment.
///
/// Names are opaque at this layer; the well-known ones are provided as
/// constants and seeded by [`ensure_default_roles`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub const ADMIN: RoleName = RoleName(Cow::Borrowed("ADMIN"));
    pub const EDITOR: RoleName = RoleName(Cow::Borrowed("EDITOR"));
    pub const VIEWER: RoleName = RoleName(Cow::Borrowed("VIEWER"));

    /// Roles seeded at bootstrap, in table order.
    pub const DEFAULTS: [RoleName; 3] = [RoleName::ADMIN, RoleName::EDITOR, RoleName::VIEWER];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        Self::DEFAULTS.contains(self)
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named set of permissions; the unit of assignment to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    pub fn new(name: RoleName, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id: RoleId::new(),
            name,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Build a role from raw permission names (e.g. loaded from a config file).
    ///
    /// Any unknown name fails the whole role: this runs at load time, never
    /// per request.
    pub fn from_names<'a>(
        name: RoleName,
        permissions: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let permissions = permissions
            .into_iter()
            .map(str::parse)
            .collect::<Result<BTreeSet<Permission>, _>>()?;
        Ok(Self {
            id: RoleId::new(),
            name,
            permissions,
        })
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

/// Default permission table.
///
/// Unlisted role names fall back to read-only.
pub fn default_role_permissions(role: &RoleName) -> BTreeSet<Permission> {
    match role.as_str() {
        "ADMIN" => BTreeSet::from([Permission::Manage]),
        "EDITOR" => BTreeSet::from([Permission::Create, Permission::Read, Permission::Update]),
        "VIEWER" => BTreeSet::from([Permission::Read]),
        _ => BTreeSet::from([Permission::Read]),
    }
}

/// The roles seeded on first startup.
pub fn default_roles() -> Vec<Role> {
    RoleName::DEFAULTS
        .into_iter()
        .map(|name| {
            let permissions = default_role_permissions(&name);
            Role::new(name, permissions)
        })
        .collect()
}

/// Role persistence as seen from the bootstrap flow.
///
/// The authorization gate never calls this; principals arrive with their
/// permissions already flattened.
pub trait RoleStore: Send + Sync {
    fn list(&self) -> Vec<Role>;
    fn find_by_name(&self, name: &RoleName) -> Option<Role>;
    fn save_all(&self, roles: Vec<Role>);
}

impl<S> RoleStore for std::sync::Arc<S>
where
    S: RoleStore + ?Sized,
{
    fn list(&self) -> Vec<Role> {
        (**self).list()
    }

    fn find_by_name(&self, name: &RoleName) -> Option<Role> {
        (**self).find_by_name(name)
    }

    fn save_all(&self, roles: Vec<Role>) {
        (**self).save_all(roles)
    }
}

/// Seed the default role table if the store holds no roles yet.
///
/// Idempotent: returns `true` only on the call that actually wrote. Meant to
/// be invoked once by the host during startup.
pub fn ensure_default_roles<S: RoleStore + ?Sized>(store: &S) -> bool {
    if !store.list().is_empty() {
        tracing::debug!("roles already present; skipping default role seeding");
        return false;
    }

    let roles = default_roles();
    tracing::info!(count = roles.len(), "seeding default roles");
    store.save_all(roles);
    true
}
