use std::sync::Arc;
use crate::auth::{AuthSubsystem, Credentials};
use crate::commons::AdminResult;
use crate::commons::audit::{AuditEventType, AuditSink};
use super::{
    AdminRequest, AdminResponse, OpScope, OpType, audit_result, instance_op,
    log_result, plugin_op, unsupported,
};


//------------ AuthAdmin -----------------------------------------------------

/// Administers the authentication managers.
///
/// Besides the plugin and instance operations, processing an instance
/// authenticates the remaining request parameters as credentials.
pub struct AuthAdmin {
    auths: Arc<AuthSubsystem>,
    audit: Arc<dyn AuditSink>,
}

impl AuthAdmin {
    pub const PATH: &'static str = "/admin/auths";

    pub fn new(auths: Arc<AuthSubsystem>, audit: Arc<dyn AuditSink>) -> Self {
        AuthAdmin { auths, audit }
    }

    /// Processes a request made by `subject`.
    pub fn process(
        &self, subject: &str, request: &AdminRequest
    ) -> AdminResult<AdminResponse> {
        let result = self.dispatch(request);
        log_result("auths", request, &result);
        let event_type = match request.op_type() {
            Ok(OpType::Process) => AuditEventType::AuthProcess,
            _ => AuditEventType::ConfigAuth,
        };
        audit_result(
            self.audit.as_ref(), event_type, subject, request, &result
        );
        result
    }

    fn dispatch(&self, request: &AdminRequest) -> AdminResult<AdminResponse> {
        let op = request.op_type()?;
        match (request.op_scope()?, op) {
            (OpScope::Impl, op) => plugin_op(&self.auths, op, request),
            (OpScope::Instance, OpType::Process) => self.authenticate(request),
            (OpScope::Instance, op) => instance_op(&self.auths, op, request),
            (scope, op) => Err(unsupported(op, scope)),
        }
    }

    fn authenticate(
        &self, request: &AdminRequest
    ) -> AdminResult<AdminResponse> {
        let credentials: Credentials = request.others(&[]).collect();
        let token = self.auths.authenticate(request.id()?, &credentials)?;
        let mut response = AdminResponse::success().with_pair(
            "subject", token.subject
        );
        for (name, value) in token.attributes {
            response.push(name, value);
        }
        Ok(response)
    }
}


//============ Tests =========================================================
