use docgate_auth::{AuthenticatedPrincipal, PrincipalId, RoleName};
use docgate_core::UserId;

/// Principal resolved for the current request.
///
/// Present in request extensions only when a valid bearer token was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: AuthenticatedPrincipal,
    email: String,
}

impl PrincipalContext {
    pub fn new(principal: AuthenticatedPrincipal, email: impl Into<String>) -> Self {
        Self {
            principal,
            email: email.into(),
        }
    }

    pub fn principal(&self) -> &AuthenticatedPrincipal {
        &self.principal
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.id()
    }

    pub fn user_id(&self) -> UserId {
        self.principal.id().into()
    }

    pub fn role(&self) -> &RoleName {
        self.principal.role()
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
