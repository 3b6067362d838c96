//! Per-route authorization gate.
//!
//! Every route is registered through [`operation`], which attaches an
//! [`Operation`] and runs [`enforce`] as a `route_layer` before the handler.
//! Handlers never see a request the gate denied.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    handler::Handler,
    http::{Method, StatusCode},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter, on},
};

use docgate_auth::{
    AuthorizationResult, ConfigError, OperationAuthorization, OperationMetadata, Verb,
    authorize_operation, explain,
};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;
use crate::middleware::RejectedCredentials;

/// How an operation is authorized.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    /// No authorization (health, login).
    Public,
    /// The HTTP verb decides the required permission on every subject.
    Default,
    /// Every listed `action:subject` rule must hold.
    Rules(&'static [&'static str]),
}

/// A registered route, as the gate sees it.
#[derive(Debug, Clone)]
pub struct Operation {
    name: &'static str,
    verb: Verb,
    metadata: OperationMetadata,
}

impl Operation {
    pub fn new(name: &'static str, method: &Method, access: Access) -> Result<Self, ConfigError> {
        let verb = Verb::from_http_method(method.as_str())?;
        let metadata = match access {
            Access::Public => OperationMetadata::public(),
            Access::Default => OperationMetadata::guarded(),
            Access::Rules(rules) => OperationMetadata::parse_rules(name, rules.iter().copied())?,
        };
        Ok(Self { name, verb, metadata })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl OperationAuthorization for Operation {
    fn verb(&self) -> Verb {
        self.verb
    }

    fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }
}

/// Register `handler` for `method` behind the gate.
///
/// Fails at router construction for methods outside POST/GET/PATCH/PUT/DELETE
/// and for malformed rule declarations.
pub fn operation<H, T, S>(
    method: Method,
    name: &'static str,
    access: Access,
    handler: H,
) -> Result<MethodRouter<S>, ConfigError>
where
    H: Handler<T, S>,
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    let operation = Operation::new(name, &method, access)?;
    let filter = MethodFilter::try_from(method.clone())
        .map_err(|_| ConfigError::UnknownVerb(method.to_string()))?;

    tracing::debug!(
        operation = name,
        method = %method,
        rules = ?operation.metadata().required_rules(operation.verb()),
        public = operation.metadata().is_public(),
        "route registered"
    );

    Ok(on(filter, handler).route_layer(from_fn_with_state(Arc::new(operation), enforce)))
}

/// Gate middleware: allow, or answer with the fixed denial.
///
/// Public operations run whatever credentials came with the request. On any
/// other operation, credentials that failed to resolve are a 401.
pub async fn enforce(State(operation): State<Arc<Operation>>, req: Request, next: Next) -> Response {
    if !operation.metadata().is_public() {
        if let Some(rejected) = req.extensions().get::<RejectedCredentials>().copied() {
            return rejected.into_response();
        }
    }

    let context = req.extensions().get::<PrincipalContext>().cloned();
    let principal = context.as_ref().map(PrincipalContext::principal);

    match authorize_operation(principal, operation.as_ref()) {
        AuthorizationResult::Allowed => next.run(req).await,
        AuthorizationResult::Denied { message, status_code } => {
            let explanation = explain(principal, operation.metadata(), operation.verb());
            tracing::info!(
                target: "audit",
                operation = operation.name(),
                verb = ?explanation.verb,
                reason = ?explanation.reason,
                principal_id = ?explanation.principal.as_ref().map(|p| p.principal_id.to_string()),
                role = ?explanation.principal.as_ref().map(|p| p.role.as_str()),
                "authorization denied"
            );
            let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::FORBIDDEN);
            json_error(status, "forbidden", message)
        }
    }
}
