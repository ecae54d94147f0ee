//! The catalog of implementation classes.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::{error, fmt};
use log::debug;


//------------ Factory -------------------------------------------------------

/// A function constructing a new object of a class.
///
/// `C` is the capability the class provides, usually a trait object type
/// such as `dyn AuthManager`.
pub type Factory<C> = Arc<dyn Fn() -> Result<Box<C>, String> + Send + Sync>;


//------------ ParamInfo and ClassInfo ---------------------------------------

/// Describes a configuration parameter understood by a class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParamInfo {
    /// The name, or a pattern such as `user_<uid>` for a family of names.
    pub name: String,
    pub description: String,
    pub required: bool,

    /// Whether the value must not be shown to administrators.
    pub secret: bool,
}

impl ParamInfo {
    /// Returns whether a parameter name is described by this info.
    ///
    /// A name with a `<placeholder>` part matches everything starting with
    /// the text before the placeholder.
    pub fn matches(&self, name: &str) -> bool {
        match self.name.split_once('<') {
            Some((prefix, _)) => name.starts_with(prefix),
            None => self.name == name,
        }
    }
}

/// Describes a class.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClassInfo {
    description: String,
    params: Vec<ParamInfo>,
}

impl ClassInfo {
    pub fn new(description: impl Into<String>) -> Self {
        ClassInfo { description: description.into(), params: Vec::new() }
    }

    /// Adds a required parameter.
    pub fn required(
        mut self, name: impl Into<String>, description: impl Into<String>
    ) -> Self {
        self.params.push(ParamInfo {
            name: name.into(),
            description: description.into(),
            required: true,
            secret: false,
        });
        self
    }

    /// Adds an optional parameter.
    pub fn optional(
        mut self, name: impl Into<String>, description: impl Into<String>
    ) -> Self {
        self.params.push(ParamInfo {
            name: name.into(),
            description: description.into(),
            required: false,
            secret: false,
        });
        self
    }

    /// Marks the most recently added parameter as secret.
    pub fn secret(mut self) -> Self {
        if let Some(param) = self.params.last_mut() {
            param.secret = true;
        }
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    /// Returns whether the value of a parameter must be hidden.
    pub fn is_secret(&self, name: &str) -> bool {
        self.params.iter().any(|param| param.secret && param.matches(name))
    }
}


//------------ ClassCatalog --------------------------------------------------

/// All classes known to the process, keyed by their class reference.
///
/// A class is registered together with the capability it provides. Looking
/// it up for a different capability fails with
/// [`ClassLoadError::IllegalType`], which is what distinguishes a class
/// that exists from one that can be used in a given place.
#[derive(Default)]
pub struct ClassCatalog {
    classes: RwLock<HashMap<String, ClassEntry>>,
}

struct ClassEntry {
    info: ClassInfo,
    capability: &'static str,

    /// A `Factory<C>` for the registered capability `C`.
    factory: Box<dyn Any + Send + Sync>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class providing capability `C`.
    pub fn register<C: ?Sized + 'static>(
        &self,
        class_ref: &str,
        info: ClassInfo,
        factory: impl Fn() -> Result<Box<C>, String> + Send + Sync + 'static,
    ) -> Result<(), ClassLoadError> {
        let factory: Factory<C> = Arc::new(factory);
        let mut classes = self.classes.write().expect("poisoned lock");
        if classes.contains_key(class_ref) {
            return Err(ClassLoadError::Duplicate(class_ref.into()))
        }
        debug!("Registered class {} for {}", class_ref, type_name::<C>());
        classes.insert(
            class_ref.into(),
            ClassEntry {
                info,
                capability: type_name::<C>(),
                factory: Box::new(factory),
            }
        );
        Ok(())
    }

    /// Returns the description of a class providing capability `C`.
    pub fn info<C: ?Sized + 'static>(
        &self, class_ref: &str
    ) -> Result<ClassInfo, ClassLoadError> {
        self.lookup::<C, _>(class_ref, |entry, _| entry.info.clone())
    }

    /// Returns the factory of a class providing capability `C`.
    pub fn factory<C: ?Sized + 'static>(
        &self, class_ref: &str
    ) -> Result<Factory<C>, ClassLoadError> {
        self.lookup::<C, _>(class_ref, |_, factory| factory.clone())
    }

    /// Constructs a new object of a class providing capability `C`.
    pub fn construct<C: ?Sized + 'static>(
        &self, class_ref: &str
    ) -> Result<Box<C>, ClassLoadError> {
        // Don’t hold the lock while running foreign code.
        let factory = self.factory::<C>(class_ref)?;
        factory().map_err(|err| {
            ClassLoadError::Construction { class: class_ref.into(), err }
        })
    }

    /// Returns the references of all classes providing capability `C`.
    ///
    /// The result is sorted.
    pub fn class_refs<C: ?Sized + 'static>(&self) -> Vec<String> {
        let classes = self.classes.read().expect("poisoned lock");
        let mut res: Vec<_> = classes.iter().filter_map(|(name, entry)| {
            entry.factory.is::<Factory<C>>().then(|| name.clone())
        }).collect();
        res.sort();
        res
    }

    fn lookup<C: ?Sized + 'static, T>(
        &self,
        class_ref: &str,
        op: impl FnOnce(&ClassEntry, &Factory<C>) -> T,
    ) -> Result<T, ClassLoadError> {
        let classes = self.classes.read().expect("poisoned lock");
        let entry = classes.get(class_ref).ok_or_else(|| {
            ClassLoadError::NotFound(class_ref.into())
        })?;
        match entry.factory.downcast_ref::<Factory<C>>() {
            Some(factory) => Ok(op(entry, factory)),
            None => {
                Err(ClassLoadError::IllegalType {
                    class: class_ref.into(),
                    provides: entry.capability,
                    expected: type_name::<C>(),
                })
            }
        }
    }
}

impl fmt::Debug for ClassCatalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let classes = self.classes.read().expect("poisoned lock");
        f.debug_map().entries(
            classes.iter().map(|(name, entry)| (name, entry.capability))
        ).finish()
    }
}


//------------ ClassLoadError ------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClassLoadError {
    NotFound(String),
    IllegalType {
        class: String,
        provides: &'static str,
        expected: &'static str,
    },
    Construction {
        class: String,
        err: String,
    },
    Duplicate(String),
}

impl fmt::Display for ClassLoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClassLoadError::NotFound(class) => {
                write!(f, "class '{class}' not found")
            }
            ClassLoadError::IllegalType { class, provides, expected } => {
                write!(f,
                    "class '{class}' provides {provides}, \
                     not {expected}"
                )
            }
            ClassLoadError::Construction { class, err } => {
                write!(f, "cannot construct '{class}': {err}")
            }
            ClassLoadError::Duplicate(class) => {
                write!(f, "class '{class}' already registered")
            }
        }
    }
}

impl error::Error for ClassLoadError { }


//============ Tests =========================================================
