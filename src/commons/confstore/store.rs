//! The configuration store.

use std::{error, fmt, io};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, info};
use url::Url;
use crate::commons::file::{self, FileError};
use super::node::{NameClash, Node};
use super::path::StorePath;
use super::segment::ParseSegmentError;
use super::substore::SubStore;


//------------ ConfigStore ---------------------------------------------------

/// A hierarchical configuration store.
///
/// The store keeps the whole configuration tree in memory. Changes made
/// through [`SubStore`] handles are visible immediately to all users of the
/// store but only become durable with [`ConfigStore::commit`].
///
/// Values are cheap to clone: all clones refer to the same store.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// The current configuration tree.
    tree: Mutex<Node>,

    /// Where the tree is persisted.
    backend: Backend,

    /// The serialized tree as of the last successful commit.
    ///
    /// The mutex also serializes commits so an older tree can never
    /// overwrite a newer one.
    committed: Mutex<Vec<u8>>,

    /// Held for the duration of a change and its commit.
    transaction: Mutex<()>,
}

impl ConfigStore {
    /// Opens the store identified by the given URI.
    ///
    /// Supported schemes are `local` and `file` for a JSON file on disk
    /// and `memory` for a store that is never persisted.
    pub fn open(uri: &Url) -> Result<Self, StoreError> {
        let backend = Backend::from_uri(uri)?;
        let tree = backend.load()?;
        let committed = serde_json::to_vec_pretty(&tree).map_err(|err| {
            StoreError::Serialize(err.to_string())
        })?;
        info!("Opened configuration store {uri}");
        Ok(ConfigStore {
            inner: Arc::new(StoreInner {
                tree: Mutex::new(tree),
                backend,
                committed: Mutex::new(committed),
                transaction: Mutex::new(()),
            })
        })
    }

    /// Creates an empty in-memory store.
    pub fn memory() -> Self {
        ConfigStore {
            inner: Arc::new(StoreInner {
                tree: Mutex::new(Node::default()),
                backend: Backend::Memory,
                committed: Mutex::new(b"{}".to_vec()),
                transaction: Mutex::new(()),
            })
        }
    }

    /// Returns a handle to the root of the tree.
    pub fn root(&self) -> SubStore {
        SubStore::new(self.clone(), StorePath::root())
    }

    /// Returns a handle to the sub store at the given path.
    ///
    /// The handle is returned whether the sub store exists or not.
    pub fn sub_store(&self, path: StorePath) -> SubStore {
        SubStore::new(self.clone(), path)
    }

    /// Makes all changes so far durable.
    ///
    /// If `sync` is set, the data is flushed to disk before returning.
    /// When the commit fails, the persisted configuration is unchanged.
    pub fn commit(&self, sync: bool) -> Result<(), StoreError> {
        let mut committed = self.inner.committed.lock().expect("poisoned lock");
        let content = self.with_tree(|tree| {
            serde_json::to_vec_pretty(tree).map_err(|err| {
                StoreError::Serialize(err.to_string())
            })
        })?;
        self.inner.backend.save(&content, sync)?;
        debug!("Committed configuration store");
        *committed = content;
        Ok(())
    }

    /// Acquires the transaction lock.
    ///
    /// Users that change the tree and then commit it hold this lock for
    /// the whole time so that a commit never picks up another user’s
    /// half-done changes which may still be rolled back.
    pub fn transaction(&self) -> MutexGuard<'_, ()> {
        self.inner.transaction.lock().expect("poisoned lock")
    }

    /// Returns the configuration as of the last successful commit.
    ///
    /// The content is the JSON representation also used on disk.
    pub fn export(&self) -> Vec<u8> {
        self.inner.committed.lock().expect("poisoned lock").clone()
    }

    /// Runs an operation on the tree while holding the tree lock.
    pub(super) fn with_tree<F, T>(&self, op: F) -> T
    where F: FnOnce(&mut Node) -> T {
        let mut tree = self.inner.tree.lock().expect("poisoned lock");
        op(&mut tree)
    }
}


//------------ Backend -------------------------------------------------------

#[derive(Debug)]
enum Backend {
    Disk(DiskBackend),
    Memory,
}

impl Backend {
    fn from_uri(uri: &Url) -> Result<Self, StoreError> {
        match uri.scheme() {
            "local" | "file" => DiskBackend::from_uri(uri).map(Backend::Disk),
            "memory" => Ok(Backend::Memory),
            scheme => Err(StoreError::UnknownScheme(scheme.into()))
        }
    }

    fn load(&self) -> Result<Node, StoreError> {
        match self {
            Backend::Disk(disk) => disk.load(),
            Backend::Memory => Ok(Node::default()),
        }
    }

    fn save(&self, content: &[u8], sync: bool) -> Result<(), StoreError> {
        match self {
            Backend::Disk(disk) => disk.save(content, sync),
            Backend::Memory => Ok(()),
        }
    }
}


//------------ DiskBackend ---------------------------------------------------

/// A configuration kept in a single JSON file.
#[derive(Debug)]
struct DiskBackend {
    path: PathBuf,
    lock_path: PathBuf,
}

impl DiskBackend {
    fn from_uri(uri: &Url) -> Result<Self, StoreError> {
        if !uri.authority().is_empty() {
            return Err(StoreError::InvalidUri(format!(
                "non-local path with host '{}'", uri.authority()
            )))
        }
        Self::new(Path::new(uri.path()))
    }

    fn new(path: &Path) -> Result<Self, StoreError> {
        if !path.is_absolute() {
            return Err(StoreError::InvalidUri(format!(
                "{} is not absolute", path.display()
            )))
        }
        let file_name = match path.file_name() {
            Some(name) => name.to_owned(),
            None => {
                return Err(StoreError::InvalidUri(format!(
                    "{} does not name a file", path.display()
                )))
            }
        };
        if let Some(dir) = path.parent() {
            file::create_dir_all(dir)?;
        }
        let mut lock_name = file_name;
        lock_name.push(".lock");
        Ok(DiskBackend {
            path: path.into(),
            lock_path: path.with_file_name(lock_name),
        })
    }

    fn load(&self) -> Result<Node, StoreError> {
        match file::read_opt(&self.path)? {
            Some(content) => {
                serde_json::from_slice(&content).map_err(|err| {
                    StoreError::Parse {
                        path: self.path.clone(),
                        err: err.to_string()
                    }
                })
            }
            None => Ok(Node::default())
        }
    }

    fn save(&self, content: &[u8], sync: bool) -> Result<(), StoreError> {
        // Keeps other processes from writing to the same file while we
        // replace it.
        let lock_file = OpenOptions::new()
            .create(true).truncate(false).read(true).write(true)
            .open(&self.lock_path)
            .map_err(|err| {
                FileError::new(
                    format!(
                        "failed to open lock file '{}'",
                        self.lock_path.display()
                    ),
                    err
                )
            })?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _guard = lock.write().map_err(|err| {
            StoreError::Lock(err.to_string())
        })?;
        file::save_atomic(content, &self.path, sync)?;
        Ok(())
    }
}


//------------ StoreError ----------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    UnknownScheme(String),
    InvalidUri(String),
    Io(FileError),
    Lock(String),
    Parse {
        path: PathBuf,
        err: String,
    },
    Serialize(String),
    InvalidName(ParseSegmentError),
    NameClash {
        path: StorePath,
        clash: NameClash,
    },
    MissingSubStore(StorePath),
    InvalidValue {
        path: StorePath,
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl StoreError {
    pub(super) fn clash(path: &StorePath, clash: NameClash) -> Self {
        StoreError::NameClash { path: path.clone(), clash }
    }
}

impl From<FileError> for StoreError {
    fn from(err: FileError) -> Self {
        StoreError::Io(err)
    }
}

impl From<ParseSegmentError> for StoreError {
    fn from(err: ParseSegmentError) -> Self {
        StoreError::InvalidName(err)
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(FileError::new("I/O error", err))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::UnknownScheme(scheme) => {
                write!(f, "unknown storage scheme: {scheme}")
            }
            StoreError::InvalidUri(err) => {
                write!(f, "invalid storage uri: {err}")
            }
            StoreError::Io(err) => err.fmt(f),
            StoreError::Lock(err) => {
                write!(f, "cannot get file lock: {err}")
            }
            StoreError::Parse { path, err } => {
                write!(f,
                    "cannot parse configuration '{}': {}",
                    path.display(), err
                )
            }
            StoreError::Serialize(err) => {
                write!(f, "cannot serialize configuration: {err}")
            }
            StoreError::InvalidName(err) => {
                write!(f, "invalid configuration name: {err}")
            }
            StoreError::NameClash { path, clash } => {
                write!(f, "in sub store '{path}': {clash}")
            }
            StoreError::MissingSubStore(path) => {
                write!(f, "no sub store '{path}'")
            }
            StoreError::InvalidValue { path, key, value, expected } => {
                write!(f,
                    "value '{value}' of '{key}' in sub store '{path}' \
                     is not {expected}"
                )
            }
        }
    }
}

impl error::Error for StoreError { }


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_uri(dir: &Path) -> Url {
        Url::parse(
            &format!("local://{}", dir.join("cs.json").display())
        ).unwrap()
    }

    #[test]
    fn unknown_scheme_fails() {
        let uri = Url::parse("postgres://localhost/cs").unwrap();
        assert!(matches!(
            ConfigStore::open(&uri), Err(StoreError::UnknownScheme(_))
        ));
    }

    #[test]
    fn commit_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let uri = disk_uri(dir.path());

        let store = ConfigStore::open(&uri).unwrap();
        let auths = store.root().make_sub_store("auths").unwrap();
        auths.put("enabled", "true").unwrap();
        store.commit(true).unwrap();

        let reopened = ConfigStore::open(&uri).unwrap();
        let auths = reopened.root().get_sub_store("auths").unwrap().unwrap();
        assert_eq!(auths.get("enabled").unwrap().as_deref(), Some("true"));
        assert_eq!(store.export(), reopened.export());
    }

    #[test]
    fn uncommitted_changes_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let uri = disk_uri(dir.path());

        let store = ConfigStore::open(&uri).unwrap();
        store.root().put("name", "ca1").unwrap();
        let committed = store.export();

        let reopened = ConfigStore::open(&uri).unwrap();
        assert!(reopened.root().get("name").unwrap().is_none());
        assert_eq!(committed, reopened.export());
    }

    #[test]
    fn failed_commit_keeps_export() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let uri = disk_uri(&store_dir);

        let store = ConfigStore::open(&uri).unwrap();
        store.root().put("name", "ca1").unwrap();
        store.commit(false).unwrap();
        let before = store.export();

        std::fs::remove_dir_all(&store_dir).unwrap();
        store.root().put("name", "ca2").unwrap();
        assert!(store.commit(false).is_err());
        assert_eq!(store.export(), before);
    }
}
