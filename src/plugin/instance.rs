//! Live instances and their configuration parameters.

use std::fmt;
use std::sync::{Arc, Mutex};
use crate::commons::confstore::Segment;
use crate::constants::PROP_PLUGIN;
use super::capability::Capability;
use super::error::Error;


//------------ Params --------------------------------------------------------

/// The configuration parameters of an instance.
///
/// Parameters keep their order. Names must be usable as keys in the
/// configuration store and must not be the reserved `pluginName`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params {
    params: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates parameters from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut res = Params::new();
        for (name, value) in pairs {
            res.insert(name, value)?;
        }
        Ok(res)
    }

    /// Sets a parameter.
    ///
    /// Setting an existing parameter keeps its position.
    pub fn insert(
        &mut self, name: impl Into<String>, value: impl Into<String>
    ) -> Result<(), Error> {
        let name = name.into();
        if let Err(err) = Segment::parse(&name) {
            return Err(Error::invalid_parameter(name, err))
        }
        if name == PROP_PLUGIN {
            return Err(Error::invalid_parameter(name, "reserved name"))
        }
        let value = value.into();
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some((_, old)) => *old = value,
            None => self.params.push((name, value)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find_map(|(key, value)| {
            (key == name).then_some(value.as_str())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}


//------------ InstanceState -------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstanceState {
    /// The instance is registered and in use.
    Active,

    /// The instance was replaced or removed and is shutting down.
    Draining,

    /// The instance has been shut down.
    Stopped,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            InstanceState::Active => "active",
            InstanceState::Draining => "draining",
            InstanceState::Stopped => "stopped",
        })
    }
}


//------------ Instance ------------------------------------------------------

/// A live, initialized object together with the configuration it was
/// created from.
pub struct Instance<C: ?Sized> {
    id: String,
    plugin_id: String,
    params: Params,
    object: Arc<C>,
    state: Mutex<InstanceState>,
}

impl<C: ?Sized> Instance<C> {
    pub(super) fn new(
        id: String, plugin_id: String, params: Params, object: Arc<C>
    ) -> Self {
        Instance {
            id, plugin_id, params, object,
            state: Mutex::new(InstanceState::Active)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the live object.
    pub fn object(&self) -> &Arc<C> {
        &self.object
    }

    pub fn state(&self) -> InstanceState {
        *self.state.lock().expect("poisoned lock")
    }
}

impl<C: ?Sized + Capability> Instance<C> {
    /// Shuts the object down.
    ///
    /// Only the first call runs the shutdown hook. The instance ends up
    /// stopped even if the hook fails.
    pub(super) fn stop(&self) -> Result<(), String> {
        {
            let mut state = self.state.lock().expect("poisoned lock");
            if *state != InstanceState::Active {
                return Ok(())
            }
            *state = InstanceState::Draining;
        }
        let res = self.object.shutdown();
        *self.state.lock().expect("poisoned lock") = InstanceState::Stopped;
        res
    }
}

impl<C: ?Sized> fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("plugin_id", &self.plugin_id)
            .field("params", &self.params)
            .finish()
    }
}


//============ Tests =========================================================
