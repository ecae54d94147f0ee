use std::sync::Arc;
use crate::commons::AdminResult;
use crate::commons::audit::{AuditEventType, AuditSink};
use crate::jobs::{JobsScheduler, SchedulerSettings};
use super::{
    AdminRequest, AdminResponse, OpScope, OpType, audit_result, instance_op,
    log_result, plugin_op, unsupported,
};


//------------ JobsAdmin -----------------------------------------------------

/// Administers the jobs and the scheduler.
pub struct JobsAdmin {
    jobs: Arc<JobsScheduler>,
    audit: Arc<dyn AuditSink>,
}

impl JobsAdmin {
    pub const PATH: &'static str = "/admin/jobs";

    /// The result of running a job.
    pub const RESULT: &'static str = "result";

    pub fn new(jobs: Arc<JobsScheduler>, audit: Arc<dyn AuditSink>) -> Self {
        JobsAdmin { jobs, audit }
    }

    /// Processes a request made by `subject`.
    pub fn process(
        &self, subject: &str, request: &AdminRequest
    ) -> AdminResult<AdminResponse> {
        let result = self.dispatch(request);
        log_result("jobs", request, &result);
        let event_type = match request.op_type() {
            Ok(OpType::Process) => AuditEventType::JobRun,
            _ => AuditEventType::ConfigJobs,
        };
        audit_result(
            self.audit.as_ref(), event_type, subject, request, &result
        );
        result
    }

    fn dispatch(&self, request: &AdminRequest) -> AdminResult<AdminResponse> {
        let op = request.op_type()?;
        match (request.op_scope()?, op) {
            (OpScope::Impl, op) => plugin_op(&self.jobs, op, request),
            (OpScope::Instance, OpType::Process) => {
                let result = self.jobs.run_job(request.id()?)?;
                Ok(AdminResponse::success().with_pair(Self::RESULT, result))
            }
            (OpScope::Instance, op) => instance_op(&self.jobs, op, request),
            (OpScope::Settings, OpType::Read) => {
                Ok(settings_response(self.jobs.settings()?))
            }
            (OpScope::Settings, OpType::Modify) => {
                let settings = self.jobs.update_settings(
                    request.parse(SchedulerSettings::ENABLED)?,
                    request.parse(SchedulerSettings::INTERVAL)?,
                )?;
                Ok(settings_response(settings))
            }
            (scope, op) => Err(unsupported(op, scope)),
        }
    }
}

fn settings_response(settings: SchedulerSettings) -> AdminResponse {
    AdminResponse::success()
        .with_pair(SchedulerSettings::ENABLED, settings.enabled.to_string())
        .with_pair(SchedulerSettings::INTERVAL, settings.interval.to_string())
}


//============ Tests =========================================================
