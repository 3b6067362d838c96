use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docgate_core::UserId;

use crate::{Permission, Role, RoleName};

/// Identity of an authenticated principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<UserId> for PrincipalId {
    fn from(value: UserId) -> Self {
        Self(*value.as_uuid())
    }
}

impl From<PrincipalId> for UserId {
    fn from(value: PrincipalId) -> Self {
        UserId::from_uuid(value.0)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The resolved identity handed to the authorization gate.
///
/// Built once per request by the credential layer from the user's current
/// role. The permission set is already flattened; authorization trusts it and
/// never looks the role name up again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedPrincipal {
    id: PrincipalId,
    role: RoleName,
    permissions: BTreeSet<Permission>,
}

impl AuthenticatedPrincipal {
    pub fn new(
        id: impl Into<PrincipalId>,
        role: RoleName,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Flatten a role's current permissions into a principal.
    pub fn from_role(id: impl Into<PrincipalId>, role: &Role) -> Self {
        Self::new(id, role.name.clone(), role.permissions.iter().copied())
    }

    pub fn id(&self) -> PrincipalId {
        self.id
    }

    pub fn role(&self) -> &RoleName {
        &self.role
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }
}
