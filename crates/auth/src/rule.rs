//! Required-permission declarations attached to operations.

use std::borrow::Cow;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Permission, Subject, Verb, map_verb};

/// An `(action, subject)` pair an operation requires.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub action: Permission,
    pub subject: Subject,
}

impl Rule {
    pub const fn new(action: Permission, subject: Subject) -> Self {
        Self { action, subject }
    }

    /// The rule synthesized for an operation without declarations.
    pub fn for_verb(verb: Verb) -> Self {
        Self::new(map_verb(verb), Subject::All)
    }
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.action, self.subject)
    }
}

/// Parses `"<action>:<subject>"`, e.g. `"manage:document"`.
impl FromStr for Rule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, subject) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedRule(s.to_string()))?;
        if action.is_empty() || subject.is_empty() || subject.contains(':') {
            return Err(ConfigError::MalformedRule(s.to_string()));
        }
        Ok(Self::new(action.parse()?, subject.parse()?))
    }
}

/// Static authorization metadata of one operation.
///
/// Resolved once when routes are registered, never per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationMetadata {
    is_public: bool,
    explicit_rules: Option<Vec<Rule>>,
}

impl OperationMetadata {
    /// No declarations: the verb decides the required permission.
    pub fn guarded() -> Self {
        Self::default()
    }

    /// No authorization at all (health checks, login).
    pub fn public() -> Self {
        Self {
            is_public: true,
            explicit_rules: None,
        }
    }

    /// Require every rule in `rules` instead of the verb default.
    ///
    /// An empty list is rejected: it would otherwise read as "no
    /// requirements" and silently open the operation.
    pub fn with_rules(operation: &str, rules: Vec<Rule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::EmptyRuleDeclaration(operation.to_string()));
        }
        Ok(Self {
            is_public: false,
            explicit_rules: Some(rules),
        })
    }

    /// Like [`Self::with_rules`], from textual declarations.
    pub fn parse_rules<'a>(
        operation: &str,
        declarations: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let rules = declarations
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Rule>, _>>()?;
        Self::with_rules(operation, rules)
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn explicit_rules(&self) -> Option<&[Rule]> {
        self.explicit_rules.as_deref()
    }

    /// Rules the gate evaluates for this operation.
    pub fn required_rules(&self, verb: Verb) -> Cow<'_, [Rule]> {
        match &self.explicit_rules {
            Some(rules) => Cow::Borrowed(rules.as_slice()),
            None => Cow::Owned(vec![Rule::for_verb(verb)]),
        }
    }
}
