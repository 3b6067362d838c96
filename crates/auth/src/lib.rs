//! `docgate-auth` — authorization decision engine and credential primitives.
//!
//! The decision path (`ability`, `verb`, `rule`, `authorize`) is pure: no IO,
//! no storage, no HTTP. Hosts hand it a resolved principal and the static
//! metadata of the operation being dispatched.

pub mod ability;
pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod rule;
pub mod subject;
pub mod verb;

pub use ability::{Ability, build_ability};
pub use authorize::{
    AuthorizationExplanation, AuthorizationResult, DENIED_MESSAGE, ExplanationReason,
    OperationAuthorization, authorize, authorize_operation, explain,
};
pub use claims::{
    Hs256JwtIssuer, Hs256JwtValidator, JwtClaims, JwtIssuer, JwtValidator, TokenValidationError,
    validate_claims,
};
pub use error::ConfigError;
pub use password::{PasswordError, PasswordHasher, verify_password};
pub use permissions::Permission;
pub use principal::{AuthenticatedPrincipal, PrincipalId};
pub use roles::{Role, RoleName, RoleStore, default_role_permissions, default_roles, ensure_default_roles};
pub use rule::{OperationMetadata, Rule};
pub use subject::Subject;
pub use verb::{Verb, map_verb};
