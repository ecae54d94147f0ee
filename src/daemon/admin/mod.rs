//! Processing admin requests.
//!
//! Each subsystem has its own admin: [`AuthAdmin`] for the authentication
//! managers and [`JobsAdmin`] for the jobs. Both understand the same
//! operations on plugins and instances which are implemented here.

pub use self::auth::AuthAdmin;
pub use self::jobs::JobsAdmin;
pub use self::request::{AdminRequest, OpScope, OpType};
pub use self::response::{
    AdminResponse, AdminStatus, NameValuePair, NameValuePairs
};

use log::{debug, warn};
use crate::commons::AdminResult;
use crate::commons::audit::{
    AuditEvent, AuditEventType, AuditOutcome, AuditSink
};
use crate::commons::error::Error;
use crate::plugin::{Capability, Kind, Params, Subsystem};

mod auth;
mod jobs;
mod request;
mod response;


/// Shown instead of the value of a secret instance parameter.
pub const HIDDEN_VALUE: &str = "********";


//------------ Plugin operations ---------------------------------------------

/// Processes an operation on the plugins of a subsystem.
fn plugin_op<C: ?Sized + Capability>(
    subsystem: &Subsystem<C>, op: OpType, request: &AdminRequest,
) -> AdminResult<AdminResponse> {
    match op {
        OpType::Search => {
            let mut response = AdminResponse::success();
            for plugin in subsystem.plugins() {
                response.push(plugin.id(), plugin.class_ref());
            }
            Ok(response)
        }
        OpType::Read => {
            let info = subsystem.class_info(request.id()?)?;
            let mut response = AdminResponse::success();
            for param in info.params() {
                response.push(param.name.as_str(), param.description.as_str());
            }
            Ok(response)
        }
        OpType::Add => {
            let id = request.id()?;
            let class_ref = request.required(AdminRequest::CLASS)?;
            subsystem.register_plugin(id, class_ref)?;
            Ok(AdminResponse::success())
        }
        OpType::Delete => {
            subsystem.unregister_plugin(request.id()?)?;
            Ok(AdminResponse::success())
        }
        OpType::Modify | OpType::Process => Err(unsupported(op, OpScope::Impl))
    }
}


//------------ Instance operations -------------------------------------------

/// Processes an operation on the instances of a subsystem.
///
/// Processing an instance is specific to the subsystem and not handled
/// here.
fn instance_op<C: ?Sized + Capability>(
    subsystem: &Subsystem<C>, op: OpType, request: &AdminRequest,
) -> AdminResult<AdminResponse> {
    match op {
        OpType::Search => {
            let mut response = AdminResponse::success();
            for instance in subsystem.instances() {
                response.push(
                    instance.id(),
                    format!("{};{}", instance.plugin_id(), instance.state())
                );
            }
            Ok(response)
        }
        OpType::Read => {
            let id = request.id()?;
            let instance = subsystem.instance(id).ok_or_else(|| {
                crate::plugin::Error::not_found(Kind::Instance, id)
            })?;
            let info = subsystem.class_info(instance.plugin_id())?;
            let mut response = AdminResponse::success().with_pair(
                AdminRequest::IMPL_NAME, instance.plugin_id()
            );
            for (name, value) in instance.params().iter() {
                if info.is_secret(name) {
                    response.push(name, HIDDEN_VALUE);
                }
                else {
                    response.push(name, value);
                }
            }
            Ok(response)
        }
        OpType::Add => {
            let id = request.id()?;
            let plugin_id = request.required(AdminRequest::IMPL_NAME)?;
            subsystem.add_instance(id, plugin_id, instance_params(request)?)?;
            Ok(AdminResponse::success())
        }
        OpType::Modify => {
            let id = request.id()?;
            let plugin_id = request.required(AdminRequest::IMPL_NAME)?;
            let (_, outcome) = subsystem.modify_instance(
                id, plugin_id, instance_params(request)?
            )?;
            Ok(AdminResponse::from_outcome(outcome))
        }
        OpType::Delete => {
            let outcome = subsystem.remove_instance(request.id()?)?;
            Ok(AdminResponse::from_outcome(outcome))
        }
        OpType::Process => Err(unsupported(op, OpScope::Instance))
    }
}

fn instance_params(request: &AdminRequest) -> AdminResult<Params> {
    Ok(Params::from_pairs(request.others(&[AdminRequest::IMPL_NAME]))?)
}

fn unsupported(op: OpType, scope: OpScope) -> Error {
    Error::InvalidOperation(format!("{op} is not supported for {scope}"))
}


//------------ Auditing ------------------------------------------------------

/// Audits the result of a request if it needs auditing.
///
/// Everything but reading and searching is audited, including requests
/// that were rejected before anything happened.
fn audit_result(
    audit: &dyn AuditSink,
    event_type: AuditEventType,
    subject: &str,
    request: &AdminRequest,
    result: &AdminResult<AdminResponse>,
) {
    if request.op_type().is_ok_and(OpType::is_read_only) {
        return
    }
    let event = match result {
        Ok(_) => AuditEvent::new(
            event_type, subject, AuditOutcome::Success, request.summary()
        ),
        Err(err) => AuditEvent::new(
            event_type, subject, AuditOutcome::Failure,
            format!("{}: {}", request.summary(), err)
        ),
    };
    audit.audit(event);
}

/// Logs the result of a request.
fn log_result(
    name: &str, request: &AdminRequest, result: &AdminResult<AdminResponse>
) {
    match result {
        Ok(response) => {
            debug!("{name}: {} -> {}", request.summary(), response.status)
        }
        Err(err) => warn!("{name}: {} failed: {err}", request.summary()),
    }
}
