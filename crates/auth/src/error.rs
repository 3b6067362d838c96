//! Configuration errors raised while loading roles and registering operations.

use thiserror::Error;

/// A deployment/configuration bug detected at startup.
///
/// These must abort startup. They are never converted into a per-request
/// denial, which would disguise a broken deployment as a permission problem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown permission '{0}'")]
    UnknownPermission(String),

    #[error("unknown subject '{0}'")]
    UnknownSubject(String),

    #[error("unknown verb for method '{0}'")]
    UnknownVerb(String),

    #[error("malformed rule declaration '{0}' (expected '<action>:<subject>')")]
    MalformedRule(String),

    #[error("operation '{0}' declares an empty rule list")]
    EmptyRuleDeclaration(String),
}
