use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Resource-type tag a rule or grant applies to.
///
/// Attached statically to each operation at registration; `All` is the
/// wildcard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    User,
    Document,
    Ingestion,
    All,
}

impl Subject {
    pub const ALL: [Subject; 4] = [Subject::User, Subject::Document, Subject::Ingestion, Subject::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::User => "user",
            Subject::Document => "document",
            Subject::Ingestion => "ingestion",
            Subject::All => "all",
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Subject::All)
    }
}

impl core::fmt::Display for Subject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSubject(s.to_string()))
    }
}
