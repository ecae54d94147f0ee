//! Authentication managers.
//!
//! An authentication manager checks credentials and, if they are fine,
//! says who the caller is. Managers are plugins: the built-in classes are
//! added to the catalog by [`register_builtin_classes`] and configured as
//! instances of the [`AuthSubsystem`].

pub use self::passwd::PasswdAuth;
pub use self::token::SharedTokenAuth;

use std::{error, fmt, ops};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use crate::commons::confstore::{ConfigStore, StoreError};
use crate::commons::error::Error;
use crate::commons::AdminResult;
use crate::constants::{AUTHS_ROOT, AUTH_INSTANCE_SUB_STORE, IMPL_SUB_STORE};
use crate::plugin::{
    Capability, ClassCatalog, ClassLoadError, Kind, Subsystem,
    SubsystemLayout,
};

mod passwd;
mod token;


/// Compares a presented secret with the expected one.
///
/// The time taken does not depend on where the two differ.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}


//------------ Credentials ---------------------------------------------------

/// The credentials presented for authentication.
///
/// Credentials are named values, such as `uid` and `pwd`. Which names a
/// manager expects is given by
/// [`AuthManager::required_credentials`].
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Credentials {
    values: Vec<(String, String)>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential, replacing an earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some((_, old)) => *old = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn with(
        mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find_map(|(key, value)| {
            (key == name).then_some(value.as_str())
        })
    }

    /// Returns a credential or fails if it is missing.
    pub fn require(&self, name: &str) -> Result<&str, AuthError> {
        self.get(name).ok_or_else(|| {
            AuthError::MissingCredential(name.into())
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(key, _)| key.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut res = Credentials::new();
        for (name, value) in iter {
            res.insert(name, value)
        }
        res
    }
}

// Never show the values.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}


//------------ AuthToken -----------------------------------------------------

/// The result of a successful authentication.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthToken {
    /// The id of the manager instance that authenticated the subject.
    pub manager: String,

    /// Who was authenticated.
    pub subject: String,

    /// Additional information about the subject.
    pub attributes: Vec<(String, String)>,
}

impl AuthToken {
    pub fn new(manager: impl Into<String>, subject: impl Into<String>) -> Self {
        AuthToken {
            manager: manager.into(),
            subject: subject.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(
        mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
}


//------------ AuthManager ---------------------------------------------------

/// The capability of authenticating callers.
pub trait AuthManager: Capability {
    /// Returns the names of the credentials this manager needs.
    fn required_credentials(&self) -> &[&'static str];

    /// Checks the credentials.
    fn authenticate(
        &self, credentials: &Credentials
    ) -> Result<AuthToken, AuthError>;
}


//------------ Built-in Classes ----------------------------------------------

/// Adds the built-in authentication manager classes to a catalog.
pub fn register_builtin_classes(
    catalog: &ClassCatalog
) -> Result<(), ClassLoadError> {
    catalog.register::<dyn AuthManager>(
        PasswdAuth::CLASS, PasswdAuth::class_info(),
        || Ok(Box::new(PasswdAuth::default()) as Box<dyn AuthManager>),
    )?;
    catalog.register::<dyn AuthManager>(
        SharedTokenAuth::CLASS, SharedTokenAuth::class_info(),
        || Ok(Box::new(SharedTokenAuth::default()) as Box<dyn AuthManager>),
    )?;
    Ok(())
}


//------------ AuthSubsystem -------------------------------------------------

/// The authentication manager plugins and instances.
///
/// Configuration lives below `auths` with plugins in `auths.impl` and
/// instances in `auths.instance`. Everything of [`Subsystem`] is available
/// through `Deref`.
pub struct AuthSubsystem {
    subsystem: Subsystem<dyn AuthManager>,
}

impl AuthSubsystem {
    pub const LAYOUT: SubsystemLayout = SubsystemLayout {
        name: "auths",
        plugin_store: IMPL_SUB_STORE,
        instance_store: AUTH_INSTANCE_SUB_STORE,
    };

    pub fn new(
        store: &ConfigStore, catalog: Arc<ClassCatalog>
    ) -> Result<Self, StoreError> {
        let root = store.root().make_sub_store(AUTHS_ROOT.as_str())?;
        Ok(AuthSubsystem {
            subsystem: Subsystem::new(root, Self::LAYOUT, catalog)
        })
    }

    /// Authenticates against the given manager instance.
    pub fn authenticate(
        &self, instance_id: &str, credentials: &Credentials
    ) -> AdminResult<AuthToken> {
        let instance = self.subsystem.instance(instance_id).ok_or_else(|| {
            crate::plugin::Error::not_found(Kind::Instance, instance_id)
        })?;
        instance.object().authenticate(credentials).map_err(Error::Auth)
    }
}

impl ops::Deref for AuthSubsystem {
    type Target = Subsystem<dyn AuthManager>;

    fn deref(&self) -> &Self::Target {
        &self.subsystem
    }
}


//------------ AuthError -----------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthError {
    MissingCredential(String),
    InvalidCredentials,
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::MissingCredential(name) => {
                write!(f, "missing credential '{name}'")
            }
            AuthError::InvalidCredentials => {
                f.write_str("invalid credentials")
            }
            AuthError::Internal(err) => {
                write!(f, "authentication failed: {err}")
            }
        }
    }
}

impl error::Error for AuthError { }


//============ Tests =========================================================
