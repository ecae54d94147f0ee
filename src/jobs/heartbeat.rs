use std::sync::atomic::{AtomicU64, Ordering};
use log::info;
use crate::commons::confstore::SubStore;
use crate::plugin::{Capability, ClassInfo};
use super::{ENABLED_PARAM, Job};


//------------ HeartbeatJob --------------------------------------------------

/// Logs a message every time it runs.
#[derive(Debug, Default)]
pub struct HeartbeatJob {
    id: String,
    message: String,
    enabled: bool,
    beats: AtomicU64,
}

impl HeartbeatJob {
    pub const CLASS: &'static str = "HeartbeatJob";

    pub fn class_info() -> ClassInfo {
        ClassInfo::new("Logs a message to show the scheduler is alive")
            .optional(ENABLED_PARAM, "run on schedule, default false")
            .optional("message", "the message to log, default 'alive'")
    }
}

impl Capability for HeartbeatJob {
    fn init(
        &mut self, instance_id: &str, _plugin_id: &str, config: &SubStore
    ) -> Result<(), String> {
        self.id = instance_id.into();
        self.message = config.get_string("message", "alive").map_err(|err| {
            err.to_string()
        })?;
        self.enabled = config.get_boolean(ENABLED_PARAM, false).map_err(|err| {
            err.to_string()
        })?;
        Ok(())
    }
}

impl Job for HeartbeatJob {
    fn run(&self) -> Result<String, String> {
        let beats = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Heartbeat {} #{}: {}", self.id, beats, self.message);
        Ok(format!("{} (#{})", self.message, beats))
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::confstore::ConfigStore;

    #[test]
    fn counts_beats() {
        let config = ConfigStore::memory().root();
        let mut job = HeartbeatJob::default();
        job.init("hb", "heartbeat", &config).unwrap();
        assert!(!job.enabled());
        assert_eq!(job.run().unwrap(), "alive (#1)");
        assert_eq!(job.run().unwrap(), "alive (#2)");
    }

    #[test]
    fn reads_params() {
        let config = ConfigStore::memory().root();
        config.put("message", "tick").unwrap();
        config.put("enabled", "true").unwrap();
        let mut job = HeartbeatJob::default();
        job.init("hb", "heartbeat", &config).unwrap();
        assert!(job.enabled());
        assert_eq!(job.run().unwrap(), "tick (#1)");

        config.put("enabled", "maybe").unwrap();
        assert!(job.init("hb", "heartbeat", &config).is_err());
    }
}
