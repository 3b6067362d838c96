use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Permission};

/// Operation kind, the transport-agnostic form of an HTTP method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    /// Resolve an HTTP method name at route registration.
    ///
    /// Methods outside the CRUD set are rejected so that no route can reach
    /// the gate without a known default permission.
    pub fn from_http_method(method: &str) -> Result<Self, ConfigError> {
        match method {
            "POST" => Ok(Verb::Create),
            "GET" => Ok(Verb::Read),
            "PATCH" | "PUT" => Ok(Verb::Update),
            "DELETE" => Ok(Verb::Delete),
            other => Err(ConfigError::UnknownVerb(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl FromStr for Verb {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_http_method(&s.to_ascii_uppercase())
    }
}

impl core::fmt::Display for Verb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default permission required by a verb when an operation declares no rules.
pub fn map_verb(verb: Verb) -> Permission {
    match verb {
        Verb::Create => Permission::Create,
        Verb::Read => Permission::Read,
        Verb::Update => Permission::Update,
        Verb::Delete => Permission::Delete,
    }
}
