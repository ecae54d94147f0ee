//! Jobs run periodically by the scheduler.
//!
//! Jobs are plugins like authentication managers. The built-in classes are
//! added to the catalog by [`register_builtin_classes`] and configured as
//! instances of the [`JobsScheduler`].

pub use self::backup::StoreBackupJob;
pub use self::heartbeat::HeartbeatJob;
pub use self::scheduler::{JobsScheduler, SchedulerSettings};

use crate::plugin::{Capability, ClassCatalog, ClassLoadError};

mod backup;
mod heartbeat;
mod scheduler;


//------------ Job -----------------------------------------------------------

/// The capability of doing some work when asked.
pub trait Job: Capability {
    /// Runs the job once and returns a short summary.
    fn run(&self) -> Result<String, String>;

    /// Returns whether the scheduler should run this job.
    ///
    /// Jobs read this from their `enabled` parameter which defaults to
    /// false.
    fn enabled(&self) -> bool;
}

/// The name of the parameter enabling a job.
pub const ENABLED_PARAM: &str = "enabled";


//------------ Built-in Classes ----------------------------------------------

/// Adds the built-in job classes to a catalog.
pub fn register_builtin_classes(
    catalog: &ClassCatalog
) -> Result<(), ClassLoadError> {
    catalog.register::<dyn Job>(
        HeartbeatJob::CLASS, HeartbeatJob::class_info(),
        || Ok(Box::new(HeartbeatJob::default()) as Box<dyn Job>),
    )?;
    catalog.register::<dyn Job>(
        StoreBackupJob::CLASS, StoreBackupJob::class_info(),
        || Ok(Box::new(StoreBackupJob::default()) as Box<dyn Job>),
    )?;
    Ok(())
}
