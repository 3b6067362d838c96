use serde::Serialize;

use crate::{
    Ability, AuthenticatedPrincipal, OperationMetadata, Permission, PrincipalId, Rule, Verb,
    build_ability,
};

/// Message returned for every denial. It never names the failing rule, so a
/// probing client cannot enumerate permissions.
pub const DENIED_MESSAGE: &str = "You are not authorized to perform this action";

/// Status code attached to every denial.
pub const DENIED_STATUS: u16 = 403;

/// Outcome of the access decision gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationResult {
    Allowed,
    Denied { message: &'static str, status_code: u16 },
}

impl AuthorizationResult {
    fn denied() -> Self {
        Self::Denied {
            message: DENIED_MESSAGE,
            status_code: DENIED_STATUS,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Operation-side authorization contract.
///
/// Implemented by whatever the host registers per route; the host passes it
/// to [`authorize_operation`] at the point of dispatch.
pub trait OperationAuthorization {
    fn verb(&self) -> Verb;
    fn metadata(&self) -> &OperationMetadata;
}

/// Access decision gate.
///
/// - No IO
/// - No panics
/// - No state: every call builds a fresh [`Ability`]
///
/// Public operations short-circuit before the ability is built. A missing
/// principal on a guarded operation is denied exactly like a failing rule.
pub fn authorize(
    principal: Option<&AuthenticatedPrincipal>,
    metadata: &OperationMetadata,
    verb: Verb,
) -> AuthorizationResult {
    if metadata.is_public() {
        return AuthorizationResult::Allowed;
    }

    let Some(principal) = principal else {
        return AuthorizationResult::denied();
    };

    let ability = build_ability(principal);
    let rules = metadata.required_rules(verb);

    match first_failing_rule(&ability, &rules) {
        None => AuthorizationResult::Allowed,
        Some(_) => AuthorizationResult::denied(),
    }
}

/// [`authorize`] for a registered operation.
pub fn authorize_operation<O>(
    principal: Option<&AuthenticatedPrincipal>,
    operation: &O,
) -> AuthorizationResult
where
    O: OperationAuthorization + ?Sized,
{
    authorize(principal, operation.metadata(), operation.verb())
}

fn first_failing_rule(ability: &Ability, rules: &[Rule]) -> Option<Rule> {
    rules
        .iter()
        .find(|rule| ability.cannot(rule.action, rule.subject))
        .copied()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Server-side account of a decision.
///
/// Unlike [`AuthorizationResult`] this names the rule that failed. It is meant
/// for audit logs and operators, never for the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub granted: bool,
    pub reason: ExplanationReason,
    pub verb: Verb,
    pub required_rules: Vec<Rule>,
    pub principal: Option<PrincipalState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplanationReason {
    PublicOperation,
    AllRulesSatisfied,
    MissingPrincipal,
    RuleFailed { rule: Rule },
}

/// Snapshot of the principal the decision was made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalState {
    pub principal_id: PrincipalId,
    pub role: String,
    pub permissions: Vec<Permission>,
}

/// Explain the decision [`authorize`] makes for the same inputs.
pub fn explain(
    principal: Option<&AuthenticatedPrincipal>,
    metadata: &OperationMetadata,
    verb: Verb,
) -> AuthorizationExplanation {
    let principal_state = principal.map(|p| PrincipalState {
        principal_id: p.id(),
        role: p.role().as_str().to_string(),
        permissions: p.permissions().iter().copied().collect(),
    });

    if metadata.is_public() {
        return AuthorizationExplanation {
            granted: true,
            reason: ExplanationReason::PublicOperation,
            verb,
            required_rules: Vec::new(),
            principal: principal_state,
        };
    }

    let required_rules = metadata.required_rules(verb).into_owned();

    let reason = match principal {
        None => ExplanationReason::MissingPrincipal,
        Some(p) => match first_failing_rule(&build_ability(p), &required_rules) {
            None => ExplanationReason::AllRulesSatisfied,
            Some(rule) => ExplanationReason::RuleFailed { rule },
        },
    };

    AuthorizationExplanation {
        granted: matches!(reason, ExplanationReason::AllRulesSatisfied),
        reason,
        verb,
        required_rules,
        principal: principal_state,
    }
}
