//! Running jobs periodically.

use std::ops;
use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, trace, warn};
use crate::commons::AdminResult;
use crate::commons::audit::{AuditEvent, AuditEventType, AuditOutcome, AuditSink};
use crate::commons::confstore::{ConfigStore, StoreError, SubStore};
use crate::commons::error::Error;
use crate::constants::{IMPL_SUB_STORE, JOBS_ROOT, JOB_INSTANCE_SUB_STORE};
use crate::plugin::{self, ClassCatalog, Kind, Subsystem, SubsystemLayout};
use super::Job;


//------------ SchedulerSettings ---------------------------------------------

/// The persisted settings of the scheduler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SchedulerSettings {
    /// Whether jobs are run at all.
    pub enabled: bool,

    /// The minutes between two runs.
    pub interval: u64,
}

impl SchedulerSettings {
    pub const ENABLED: &'static str = "enabled";
    pub const INTERVAL: &'static str = "interval";

    /// The longest interval in minutes: one week.
    pub const MAX_INTERVAL: u64 = 7 * 24 * 60;

    pub fn interval(&self) -> Duration {
        Duration::from_secs(
            self.interval.clamp(1, Self::MAX_INTERVAL).saturating_mul(60)
        )
    }

    fn check_interval(interval: u64) -> Result<u64, Error> {
        if (1..=Self::MAX_INTERVAL).contains(&interval) {
            Ok(interval)
        }
        else {
            Err(Error::invalid_parameter(
                Self::INTERVAL,
                format!("must be between 1 and {}", Self::MAX_INTERVAL)
            ))
        }
    }

    /// Reads the settings from the scheduler root.
    ///
    /// A stored interval outside the allowed range is clamped.
    fn read(root: &SubStore) -> Result<Self, StoreError> {
        let enabled = root.get_boolean(Self::ENABLED, false)?;
        let interval = root.get_integer(Self::INTERVAL, 1)?;
        Ok(SchedulerSettings {
            enabled,
            interval: u64::try_from(interval).unwrap_or(1).clamp(
                1, Self::MAX_INTERVAL
            ),
        })
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings { enabled: false, interval: 1 }
    }
}


//------------ JobsScheduler -------------------------------------------------

/// The job plugins and instances and the loop running them.
///
/// Configuration lives below `jobsScheduler` with plugins in `impl`,
/// instances in `job` and the scheduler settings as values of the root.
/// Everything of [`Subsystem`] is available through `Deref`.
pub struct JobsScheduler {
    subsystem: Subsystem<dyn Job>,
    audit: Arc<dyn AuditSink>,
}

impl JobsScheduler {
    pub const LAYOUT: SubsystemLayout = SubsystemLayout {
        name: "jobs",
        plugin_store: IMPL_SUB_STORE,
        instance_store: JOB_INSTANCE_SUB_STORE,
    };

    /// The audit subject of scheduled job runs.
    pub const SUBJECT: &'static str = "scheduler";

    pub fn new(
        store: &ConfigStore,
        catalog: Arc<ClassCatalog>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, StoreError> {
        let root = store.root().make_sub_store(JOBS_ROOT.as_str())?;
        Ok(JobsScheduler {
            subsystem: Subsystem::new(root, Self::LAYOUT, catalog),
            audit,
        })
    }
}

/// # Settings
impl JobsScheduler {
    pub fn settings(&self) -> AdminResult<SchedulerSettings> {
        Ok(SchedulerSettings::read(self.subsystem.root())?)
    }

    /// Changes and commits the settings.
    ///
    /// Settings not given stay as they are. Values are checked before
    /// anything is written. The new settings take effect with the next
    /// tick of the scheduler.
    pub fn update_settings(
        &self, enabled: Option<bool>, interval: Option<u64>,
    ) -> AdminResult<SchedulerSettings> {
        let interval = interval.map(
            SchedulerSettings::check_interval
        ).transpose()?;
        let settings = self.subsystem.update(|root| {
            let current = SchedulerSettings::read(root)?;
            let settings = SchedulerSettings {
                enabled: enabled.unwrap_or(current.enabled),
                interval: interval.unwrap_or(current.interval),
            };
            if enabled.is_some() {
                root.put(
                    SchedulerSettings::ENABLED, settings.enabled.to_string()
                )?;
            }
            if interval.is_some() {
                root.put(
                    SchedulerSettings::INTERVAL, settings.interval.to_string()
                )?;
            }
            Ok(settings)
        })?;
        Ok(settings)
    }
}

/// # Running jobs
impl JobsScheduler {
    /// Runs a job right now, whether it is enabled or not.
    pub fn run_job(&self, id: &str) -> AdminResult<String> {
        let instance = self.subsystem.instance(id).ok_or_else(|| {
            plugin::Error::not_found(Kind::Instance, id)
        })?;
        debug!("Running job '{id}'");
        instance.object().run().map_err(|err| {
            Error::JobFailed { id: id.into(), err }
        })
    }

    /// Runs all enabled jobs and audits each run.
    pub fn run_enabled_jobs(&self) {
        for instance in self.subsystem.instances() {
            if !instance.object().enabled() {
                trace!("Skipping disabled job '{}'", instance.id());
                continue
            }
            let event = match self.run_job(instance.id()) {
                Ok(res) => AuditEvent::new(
                    AuditEventType::JobRun, Self::SUBJECT,
                    AuditOutcome::Success,
                    format!("job {}: {}", instance.id(), res),
                ),
                Err(err) => {
                    warn!("{err}");
                    AuditEvent::new(
                        AuditEventType::JobRun, Self::SUBJECT,
                        AuditOutcome::Failure,
                        format!("job {}: {}", instance.id(), err),
                    )
                }
            };
            self.audit.audit(event);
        }
    }

    /// Runs enabled jobs every interval for as long as the process lives.
    ///
    /// Settings are read anew at every tick.
    pub async fn run(self: Arc<Self>) {
        loop {
            let settings = self.current_settings();
            tokio::time::sleep(settings.interval()).await;

            if !self.current_settings().enabled {
                trace!("Scheduler disabled, not running jobs");
                continue
            }
            let scheduler = self.clone();
            let res = tokio::task::spawn_blocking(move || {
                scheduler.run_enabled_jobs()
            }).await;
            if let Err(err) = res {
                error!("Running jobs failed: {err}");
            }
        }
    }

    fn current_settings(&self) -> SchedulerSettings {
        self.settings().unwrap_or_else(|err| {
            warn!("Invalid scheduler settings, using defaults: {err}");
            SchedulerSettings::default()
        })
    }
}

impl ops::Deref for JobsScheduler {
    type Target = Subsystem<dyn Job>;

    fn deref(&self) -> &Self::Target {
        &self.subsystem
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::audit::MemoryAuditSink;
    use crate::jobs::{HeartbeatJob, register_builtin_classes};
    use crate::plugin::Params;

    fn scheduler(audit: Arc<MemoryAuditSink>) -> JobsScheduler {
        let catalog = ClassCatalog::new();
        register_builtin_classes(&catalog).unwrap();
        let scheduler = JobsScheduler::new(
            &ConfigStore::memory(), Arc::new(catalog), audit
        ).unwrap();
        scheduler.register_plugin("heartbeat", HeartbeatJob::CLASS).unwrap();
        scheduler
    }

    #[test]
    fn settings_defaults_and_update() {
        let scheduler = scheduler(Arc::default());
        assert_eq!(scheduler.settings().unwrap(), SchedulerSettings::default());

        let settings = scheduler.update_settings(Some(true), Some(15)).unwrap();
        assert_eq!(settings, SchedulerSettings { enabled: true, interval: 15 });
        assert_eq!(settings.interval(), Duration::from_secs(900));

        assert!(matches!(
            scheduler.update_settings(Some(false), Some(0)),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(scheduler.settings().unwrap().enabled);
    }

    #[test]
    fn out_of_range_interval_changes_nothing() {
        let store = ConfigStore::memory();
        let catalog = ClassCatalog::new();
        register_builtin_classes(&catalog).unwrap();
        let scheduler = JobsScheduler::new(
            &store, Arc::new(catalog), Arc::new(MemoryAuditSink::default())
        ).unwrap();
        scheduler.update_settings(Some(true), Some(30)).unwrap();
        let before = store.export();

        for interval in [
            SchedulerSettings::MAX_INTERVAL + 1, i64::MAX as u64 + 1, u64::MAX
        ] {
            assert!(matches!(
                scheduler.update_settings(Some(false), Some(interval)),
                Err(Error::InvalidParameter { .. })
            ));
        }
        assert_eq!(store.export(), before);
        assert_eq!(
            scheduler.settings().unwrap(),
            SchedulerSettings { enabled: true, interval: 30 }
        );

        let settings = scheduler.update_settings(
            None, Some(SchedulerSettings::MAX_INTERVAL)
        ).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings, scheduler.settings().unwrap());
    }

    #[test]
    fn interval_duration_never_overflows() {
        let settings = SchedulerSettings {
            enabled: true, interval: 307_445_734_561_825_861
        };
        assert_eq!(
            settings.interval(),
            Duration::from_secs(SchedulerSettings::MAX_INTERVAL * 60)
        );

        // A stored value out of range is clamped when read.
        let scheduler = scheduler(Arc::default());
        scheduler.root().put("interval", "99999999").unwrap();
        assert_eq!(
            scheduler.settings().unwrap().interval,
            SchedulerSettings::MAX_INTERVAL
        );
        scheduler.root().put("interval", "-3").unwrap();
        assert_eq!(scheduler.settings().unwrap().interval, 1);
    }

    #[test]
    fn run_only_enabled_jobs() {
        let audit = Arc::new(MemoryAuditSink::default());
        let scheduler = scheduler(audit.clone());
        scheduler.add_instance(
            "on", "heartbeat", Params::from_pairs([("enabled", "true")]).unwrap()
        ).unwrap();
        scheduler.add_instance("off", "heartbeat", Params::new()).unwrap();

        scheduler.run_enabled_jobs();
        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::JobRun);
        assert_eq!(events[0].subject, JobsScheduler::SUBJECT);
        assert_eq!(events[0].message, "job on: alive (#1)");

        assert_eq!(scheduler.run_job("off").unwrap(), "alive (#1)");
        assert!(matches!(
            scheduler.run_job("missing"),
            Err(Error::Plugin(plugin::Error::NotFound { .. }))
        ));
    }
}
