//! Capability set evaluated by the authorization gate.
//!
//! An [`Ability`] is rebuilt from the principal on every decision. It is cheap
//! to construct and never cached, so a revoked permission stops working on the
//! next request.

use std::collections::BTreeSet;

use crate::{AuthenticatedPrincipal, Permission, Subject};

/// Set of `(action, subject)` grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ability {
    grants: BTreeSet<(Permission, Subject)>,
}

impl Ability {
    /// An ability that grants nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Grant every permission against the wildcard subject.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut ability = Self::empty();
        for permission in permissions {
            ability.grant(permission, Subject::All);
        }
        ability
    }

    /// Add a single grant. Subject-scoped grants are accepted but no default
    /// role produces them.
    pub fn grant(&mut self, action: Permission, subject: Subject) {
        self.grants.insert((action, subject));
    }

    /// Whether `action` may be performed on `subject`.
    ///
    /// A `manage` grant satisfies any action. Wildcard grants satisfy concrete
    /// subjects; concrete grants never satisfy a wildcard query.
    pub fn can(&self, action: Permission, subject: Subject) -> bool {
        if self.holds(action, subject) || self.holds(Permission::Manage, subject) {
            return true;
        }

        !subject.is_wildcard()
            && (self.holds(action, Subject::All) || self.holds(Permission::Manage, Subject::All))
    }

    pub fn cannot(&self, action: Permission, subject: Subject) -> bool {
        !self.can(action, subject)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Actions this ability allows on `subject`, in vocabulary order.
    pub fn permitted_actions(&self, subject: Subject) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|action| self.can(*action, subject))
            .collect()
    }

    pub fn grants(&self) -> impl Iterator<Item = &(Permission, Subject)> {
        self.grants.iter()
    }

    fn holds(&self, action: Permission, subject: Subject) -> bool {
        self.grants.contains(&(action, subject))
    }
}

/// Build the capability set for a principal.
///
/// Pure and deterministic: identical principals yield identical abilities.
pub fn build_ability(principal: &AuthenticatedPrincipal) -> Ability {
    Ability::from_permissions(principal.permissions().iter().copied())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use docgate_core::UserId;

    use super::*;
    use crate::RoleName;

    const CRUD: [Permission; 4] = [
        Permission::Create,
        Permission::Read,
        Permission::Update,
        Permission::Delete,
    ];

    fn principal(perms: &[Permission]) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal::new(UserId::new(), RoleName::new("custom"), perms.iter().copied())
    }

    #[test]
    fn read_only_principal() {
        let ability = build_ability(&principal(&[Permission::Read]));

        assert!(ability.can(Permission::Read, Subject::All));
        assert!(ability.cannot(Permission::Create, Subject::All));
        assert!(ability.cannot(Permission::Update, Subject::All));
        assert!(ability.cannot(Permission::Delete, Subject::All));
    }

    #[test]
    fn create_and_update_but_not_read_or_delete() {
        let ability = build_ability(&principal(&[Permission::Create, Permission::Update]));

        assert!(ability.can(Permission::Create, Subject::All));
        assert!(ability.can(Permission::Update, Subject::All));
        assert!(ability.cannot(Permission::Read, Subject::All));
        assert!(ability.cannot(Permission::Delete, Subject::All));
    }

    #[test]
    fn all_four_crud_permissions_are_not_manage() {
        let ability = build_ability(&principal(&CRUD));

        for action in CRUD {
            assert!(ability.can(action, Subject::All));
        }
        assert!(ability.cannot(Permission::Manage, Subject::All));
        assert!(ability.cannot(Permission::Manage, Subject::Document));
    }

    #[test]
    fn empty_permission_set_grants_nothing() {
        let ability = build_ability(&principal(&[]));

        assert!(ability.is_empty());
        for action in Permission::ALL {
            for subject in Subject::ALL {
                assert!(ability.cannot(action, subject));
            }
        }
    }

    #[test]
    fn concrete_grant_does_not_satisfy_wildcard_query() {
        let mut ability = Ability::empty();
        ability.grant(Permission::Read, Subject::Document);

        assert!(ability.can(Permission::Read, Subject::Document));
        assert!(ability.cannot(Permission::Read, Subject::All));
        assert!(ability.cannot(Permission::Read, Subject::User));
    }

    #[test]
    fn scoped_manage_covers_only_its_subject() {
        let mut ability = Ability::empty();
        ability.grant(Permission::Manage, Subject::Ingestion);

        assert!(ability.can(Permission::Delete, Subject::Ingestion));
        assert!(ability.cannot(Permission::Delete, Subject::Document));
        assert!(ability.cannot(Permission::Manage, Subject::All));
    }

    #[test]
    fn permitted_actions_lists_vocabulary_order() {
        let ability = build_ability(&principal(&[Permission::Update, Permission::Create]));
        assert_eq!(
            ability.permitted_actions(Subject::Document),
            vec![Permission::Create, Permission::Update]
        );

        let admin = build_ability(&principal(&[Permission::Manage]));
        assert_eq!(admin.permitted_actions(Subject::User), Permission::ALL.to_vec());
    }

    fn permission_set() -> impl Strategy<Value = BTreeSet<Permission>> {
        prop::collection::btree_set(prop::sample::select(Permission::ALL.to_vec()), 0..=5)
    }

    fn subject() -> impl Strategy<Value = Subject> {
        prop::sample::select(Subject::ALL.to_vec())
    }

    fn action() -> impl Strategy<Value = Permission> {
        prop::sample::select(Permission::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: a superset of permissions never loses a grant.
        #[test]
        fn ability_is_monotonic(
            small in permission_set(),
            extra in permission_set(),
            action in action(),
            subject in subject(),
        ) {
            let large: BTreeSet<Permission> = small.union(&extra).copied().collect();
            let q = Ability::from_permissions(small);
            let p = Ability::from_permissions(large);

            prop_assert!(!q.can(action, subject) || p.can(action, subject));
        }

        /// Property: `{manage}` alone satisfies every action on every subject.
        #[test]
        fn manage_dominates(action in action(), subject in subject()) {
            let ability = Ability::from_permissions([Permission::Manage]);
            prop_assert!(ability.can(action, subject));
        }

        /// Property: building twice from the same principal is deterministic.
        #[test]
        fn build_is_deterministic(perms in permission_set()) {
            let p: Vec<Permission> = perms.into_iter().collect();
            prop_assert_eq!(build_ability(&principal(&p)), build_ability(&principal(&p)));
        }
    }
}
