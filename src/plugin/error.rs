use std::{error, fmt};
use crate::commons::confstore::StoreError;
use super::catalog::ClassLoadError;


//------------ Kind ----------------------------------------------------------

/// What an id refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Plugin,
    Instance,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Kind::Plugin => "plugin",
            Kind::Instance => "instance",
        })
    }
}


//------------ Error ---------------------------------------------------------

/// An error happened while managing plugins or instances.
///
/// Errors up to and including [`Error::ClassLoad`] are detected before
/// anything is changed. The others are reported after the configuration
/// has been rolled back.
#[derive(Debug)]
pub enum Error {
    DuplicateId {
        kind: Kind,
        id: String,
    },
    NotFound {
        kind: Kind,
        id: String,
    },
    InUse {
        plugin: String,
        instances: Vec<String>,
    },
    InvalidReference(String),
    InvalidParameter {
        name: String,
        reason: String,
    },
    ClassLoad(ClassLoadError),
    ConstructionFailed {
        id: String,
        err: String,
    },
    InitFailed {
        id: String,
        err: String,
    },
    CommitFailed(StoreError),
    Store(StoreError),
}

impl Error {
    pub fn duplicate(kind: Kind, id: impl Into<String>) -> Self {
        Error::DuplicateId { kind, id: id.into() }
    }

    pub fn not_found(kind: Kind, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }

    pub fn invalid_parameter(
        name: impl Into<String>, reason: impl fmt::Display
    ) -> Self {
        Error::InvalidParameter {
            name: name.into(), reason: reason.to_string()
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<ClassLoadError> for Error {
    fn from(err: ClassLoadError) -> Self {
        Error::ClassLoad(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateId { kind, id } => {
                write!(f, "{kind} '{id}' already exists")
            }
            Error::NotFound { kind, id } => {
                write!(f, "{kind} '{id}' not found")
            }
            Error::InUse { plugin, instances } => {
                write!(f,
                    "plugin '{}' is used by instance(s) {}",
                    plugin, instances.join(", ")
                )
            }
            Error::InvalidReference(plugin) => {
                write!(f, "no plugin '{plugin}'")
            }
            Error::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Error::ClassLoad(err) => err.fmt(f),
            Error::ConstructionFailed { id, err } => {
                write!(f, "cannot construct instance '{id}': {err}")
            }
            Error::InitFailed { id, err } => {
                write!(f, "cannot initialize instance '{id}': {err}")
            }
            Error::CommitFailed(err) => {
                write!(f, "cannot commit configuration: {err}")
            }
            Error::Store(err) => err.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::ClassLoad(err) => Some(err),
            Error::CommitFailed(err) | Error::Store(err) => Some(err),
            _ => None,
        }
    }
}
