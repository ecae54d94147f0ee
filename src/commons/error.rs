//! Defines all cmsadmin server side errors.

use std::{error, fmt, io};
use hyper::StatusCode;
use crate::auth::AuthError;
use crate::plugin;
use crate::commons::confstore::StoreError;
use crate::commons::file::FileError;


//------------ Error ---------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    //-----------------------------------------------------------------
    // System Issues
    //-----------------------------------------------------------------

    /// An I/O error outside of the configuration store.
    Io(FileError),

    /// The configuration store failed.
    Store(StoreError),

    /// Something went wrong that shouldn’t have.
    Custom(String),

    //-----------------------------------------------------------------
    // General API Client Issues
    //-----------------------------------------------------------------

    ApiUnknownMethod,
    ApiUnknownResource,
    ApiInvalidCredentials(String),
    ApiPostTooBig(u64),
    ApiPostCannotRead(String),
    ApiInvalidForm(String),

    //-----------------------------------------------------------------
    // Admin Operations
    //-----------------------------------------------------------------

    /// A required request parameter is absent.
    MissingParameter(String),

    /// A request parameter has an unacceptable value.
    InvalidParameter {
        name: String,
        err: String,
    },

    /// The operation or scope is not supported at this path.
    InvalidOperation(String),

    /// The plugin registry refused or failed an operation.
    Plugin(plugin::Error),

    /// Authentication against a manager instance failed.
    Auth(AuthError),

    /// A job ran and failed.
    JobFailed {
        id: String,
        err: String,
    },
}

impl Error {
    pub fn custom(msg: impl fmt::Display) -> Self {
        Error::Custom(msg.to_string())
    }

    pub fn invalid_parameter(
        name: impl Into<String>, err: impl fmt::Display
    ) -> Self {
        Error::InvalidParameter { name: name.into(), err: err.to_string() }
    }

    /// Returns the HTTP status code to use for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Io(_) | Error::Store(_) | Error::Custom(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::ApiUnknownMethod => StatusCode::METHOD_NOT_ALLOWED,
            Error::ApiUnknownResource => StatusCode::NOT_FOUND,
            Error::ApiInvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            Error::ApiPostTooBig(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::ApiPostCannotRead(_) | Error::ApiInvalidForm(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::MissingParameter(_)
            | Error::InvalidParameter { .. }
            | Error::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Error::Plugin(err) => match err {
                plugin::Error::NotFound { .. } => StatusCode::NOT_FOUND,
                plugin::Error::DuplicateId { .. }
                | plugin::Error::InUse { .. } => StatusCode::CONFLICT,
                plugin::Error::InvalidReference(_)
                | plugin::Error::InvalidParameter { .. }
                | plugin::Error::ClassLoad(_)
                | plugin::Error::ConstructionFailed { .. }
                | plugin::Error::InitFailed { .. } => StatusCode::BAD_REQUEST,
                plugin::Error::CommitFailed(_)
                | plugin::Error::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Error::Auth(AuthError::Internal(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::JobFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}


//--- From

impl From<FileError> for Error {
    fn from(err: FileError) -> Self {
        Error::Io(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(FileError::new("I/O error", err))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<plugin::Error> for Error {
    fn from(err: plugin::Error) -> Self {
        Error::Plugin(err)
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        Error::Auth(err)
    }
}


//--- Display and Error

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Store(err) => err.fmt(f),
            Error::Custom(msg) => f.write_str(msg),
            Error::ApiUnknownMethod => f.write_str("Unknown API method"),
            Error::ApiUnknownResource => f.write_str("Unknown resource"),
            Error::ApiInvalidCredentials(msg) => {
                write!(f, "Invalid credentials: {msg}")
            }
            Error::ApiPostTooBig(limit) => {
                write!(f, "Request body exceeds limit of {limit} bytes")
            }
            Error::ApiPostCannotRead(err) => {
                write!(f, "Cannot read request body: {err}")
            }
            Error::ApiInvalidForm(err) => {
                write!(f, "Invalid form data: {err}")
            }
            Error::MissingParameter(name) => {
                write!(f, "Missing parameter '{name}'")
            }
            Error::InvalidParameter { name, err } => {
                write!(f, "Invalid parameter '{name}': {err}")
            }
            Error::InvalidOperation(msg) => {
                write!(f, "Invalid operation: {msg}")
            }
            Error::Plugin(err) => err.fmt(f),
            Error::Auth(err) => err.fmt(f),
            Error::JobFailed { id, err } => {
                write!(f, "Job '{id}' failed: {err}")
            }
        }
    }
}

impl error::Error for Error { }


//============ Tests =========================================================
