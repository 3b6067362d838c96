//! Role persistence backing the bootstrap flow and principal resolution.

use docgate_auth::{Role, RoleName, RoleStore};

use crate::store::{InMemoryStore, Store};

/// In-memory role table.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    roles: InMemoryStore<Role>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleStore for InMemoryRoleStore {
    fn list(&self) -> Vec<Role> {
        self.roles.list()
    }

    fn find_by_name(&self, name: &RoleName) -> Option<Role> {
        self.roles.find(|r| &r.name == name)
    }

    fn save_all(&self, roles: Vec<Role>) {
        for role in roles {
            let name = role.name.clone();
            if !self.roles.upsert_unless(role, &|existing: &Role| existing.name == name) {
                tracing::warn!(role = %name, "role name already taken; skipping");
            }
        }
    }
}
