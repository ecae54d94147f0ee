//! Backing up the committed configuration.

use std::path::PathBuf;
use chrono::Utc;
use log::{debug, info};
use crate::commons::confstore::{ConfigStore, SubStore};
use crate::commons::file;
use crate::plugin::{Capability, ClassInfo};
use super::{ENABLED_PARAM, Job};


//------------ StoreBackupJob ------------------------------------------------

/// Writes the committed configuration to a backup directory.
///
/// Each run creates a file `cmsadmin-<timestamp>.json`. Only the newest
/// `keep` of these files are kept.
#[derive(Debug, Default)]
pub struct StoreBackupJob {
    store: Option<ConfigStore>,
    dir: PathBuf,
    keep: usize,
    enabled: bool,
}

impl StoreBackupJob {
    pub const CLASS: &'static str = "StoreBackupJob";

    const PREFIX: &'static str = "cmsadmin-";
    const SUFFIX: &'static str = ".json";
    const DEFAULT_KEEP: i64 = 5;

    pub fn class_info() -> ClassInfo {
        ClassInfo::new("Copies the committed configuration to a directory")
            .required("dir", "the directory to write backups to")
            .optional("keep", "the number of backups to keep, default 5")
            .optional(ENABLED_PARAM, "run on schedule, default false")
    }

    fn backups(&self) -> Result<Vec<PathBuf>, String> {
        let files = file::list_files(&self.dir).map_err(|err| {
            err.to_string()
        })?;
        Ok(files.into_iter().filter(|path| {
            path.file_name().and_then(|name| name.to_str()).is_some_and(
                |name| name.starts_with(Self::PREFIX)
                    && name.ends_with(Self::SUFFIX)
            )
        }).collect())
    }
}

impl Capability for StoreBackupJob {
    fn init(
        &mut self, _instance_id: &str, _plugin_id: &str, config: &SubStore
    ) -> Result<(), String> {
        let dir = config.get("dir").map_err(|err| err.to_string())?
            .ok_or("missing parameter 'dir'")?;
        self.dir = PathBuf::from(dir);
        if !self.dir.is_absolute() {
            return Err(format!(
                "backup dir '{}' is not absolute", self.dir.display()
            ))
        }
        let keep = config.get_integer("keep", Self::DEFAULT_KEEP).map_err(
            |err| err.to_string()
        )?;
        self.keep = match usize::try_from(keep) {
            Ok(keep) if keep > 0 => keep,
            _ => return Err(format!("invalid value '{keep}' for 'keep'"))
        };
        self.enabled = config.get_boolean(ENABLED_PARAM, false).map_err(
            |err| err.to_string()
        )?;
        self.store = Some(config.store().clone());
        Ok(())
    }
}

impl Job for StoreBackupJob {
    fn run(&self) -> Result<String, String> {
        let store = self.store.as_ref().ok_or("not initialized")?;
        file::create_dir_all(&self.dir).map_err(|err| err.to_string())?;

        let path = self.dir.join(format!(
            "{}{}{}",
            Self::PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ"),
            Self::SUFFIX,
        ));
        file::save_atomic(&store.export(), &path, true).map_err(|err| {
            err.to_string()
        })?;
        info!("Wrote configuration backup {}", path.display());

        // The timestamp format sorts by age.
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.keep);
        for old in &backups[..excess] {
            debug!("Removing old backup {}", old.display());
            file::delete_file(old).map_err(|err| err.to_string())?;
        }
        Ok(path.display().to_string())
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}


//============ Tests =========================================================
