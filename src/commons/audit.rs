//! The audit trail of administrative operations.

use std::fmt;
use std::sync::Mutex;
use log::{info, warn};


//------------ AuditOutcome --------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Failure => "FAILURE",
        })
    }
}


//------------ AuditEventType ------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditEventType {
    /// Change to the authentication manager configuration.
    ConfigAuth,

    /// Change to the jobs configuration.
    ConfigJobs,

    /// Authentication against a manager instance.
    AuthProcess,

    /// A job was run.
    JobRun,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventType::ConfigAuth => "CONFIG_AUTH",
            AuditEventType::ConfigJobs => "CONFIG_JOBS",
            AuditEventType::AuthProcess => "AUTH_PROCESS",
            AuditEventType::JobRun => "JOB_RUN",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


//------------ AuditEvent ----------------------------------------------------

/// A single entry of the audit trail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub subject: String,
    pub outcome: AuditOutcome,
    pub message: String,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        subject: impl Into<String>,
        outcome: AuditOutcome,
        message: impl Into<String>,
    ) -> Self {
        AuditEvent {
            event_type,
            subject: subject.into(),
            outcome,
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
            "[AuditEvent={}][SubjectID={}][Outcome={}] {}",
            self.event_type, self.subject, self.outcome, self.message
        )
    }
}


//------------ AuditSink -----------------------------------------------------

/// Something that records audit events.
pub trait AuditSink: Send + Sync {
    fn audit(&self, event: AuditEvent);
}


//------------ LogAuditSink --------------------------------------------------

/// Writes audit events to the regular log under the `cmsadmin::audit`
/// target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAuditSink;

impl LogAuditSink {
    pub const TARGET: &'static str = "cmsadmin::audit";
}

impl AuditSink for LogAuditSink {
    fn audit(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Success => info!(target: Self::TARGET, "{event}"),
            AuditOutcome::Failure => warn!(target: Self::TARGET, "{event}"),
        }
    }
}


//------------ MemoryAuditSink -----------------------------------------------

/// Keeps audit events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("poisoned lock").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn audit(&self, event: AuditEvent) {
        self.events.lock().expect("poisoned lock").push(event)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display() {
        let event = AuditEvent::new(
            AuditEventType::ConfigAuth, "admin", AuditOutcome::Failure,
            "add instance inst1: duplicate id",
        );
        assert_eq!(
            event.to_string(),
            "[AuditEvent=CONFIG_AUTH][SubjectID=admin][Outcome=FAILURE] \
             add instance inst1: duplicate id"
        );
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryAuditSink::default();
        sink.audit(AuditEvent::new(
            AuditEventType::JobRun, "scheduler", AuditOutcome::Success, "a"
        ));
        sink.audit(AuditEvent::new(
            AuditEventType::JobRun, "scheduler", AuditOutcome::Failure, "b"
        ));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "a");
        assert_eq!(events[1].outcome, AuditOutcome::Failure);
    }
}
