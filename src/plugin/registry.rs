//! The in-memory registry of plugins and instances.

use std::sync::Arc;
use super::error::{Error, Kind};
use super::instance::Instance;


//------------ PluginDescriptor ----------------------------------------------

/// A registered implementation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PluginDescriptor {
    id: String,
    class_ref: String,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, class_ref: impl Into<String>) -> Self {
        PluginDescriptor { id: id.into(), class_ref: class_ref.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_ref(&self) -> &str {
        &self.class_ref
    }
}


//------------ PluginRegistry ------------------------------------------------

/// The plugins and instances of one subsystem.
///
/// The registry only does the bookkeeping. It is not synchronized itself;
/// [`Subsystem`][super::Subsystem] keeps it behind its lock and takes care
/// of persisting changes.
#[derive(Debug)]
pub struct PluginRegistry<C: ?Sized> {
    plugins: Vec<PluginDescriptor>,
    instances: Vec<Arc<Instance<C>>>,
}

impl<C: ?Sized> Default for PluginRegistry<C> {
    fn default() -> Self {
        PluginRegistry { plugins: Vec::new(), instances: Vec::new() }
    }
}

/// # Plugins
impl<C: ?Sized> PluginRegistry<C> {
    pub fn register(
        &mut self, id: &str, class_ref: &str
    ) -> Result<(), Error> {
        if self.lookup(id).is_some() {
            return Err(Error::duplicate(Kind::Plugin, id))
        }
        self.plugins.push(PluginDescriptor::new(id, class_ref));
        Ok(())
    }

    /// Removes a plugin.
    ///
    /// Fails without changing anything if any instance refers to the
    /// plugin.
    pub fn unregister(&mut self, id: &str) -> Result<(), Error> {
        self.check_unregister(id)?;
        self.plugins.retain(|plugin| plugin.id != id);
        Ok(())
    }

    /// Checks whether a plugin could be removed right now.
    pub fn check_unregister(&self, id: &str) -> Result<(), Error> {
        if self.lookup(id).is_none() {
            return Err(Error::not_found(Kind::Plugin, id))
        }
        let users: Vec<_> = self.instances.iter().filter(|inst| {
            inst.plugin_id() == id
        }).map(|inst| inst.id().to_string()).collect();
        if users.is_empty() {
            Ok(())
        }
        else {
            Err(Error::InUse { plugin: id.into(), instances: users })
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|plugin| plugin.id == id)
    }

    /// Returns all plugins in the order they were registered.
    pub fn list(&self) -> &[PluginDescriptor] {
        &self.plugins
    }
}

/// # Instances
impl<C: ?Sized> PluginRegistry<C> {
    pub fn instance(&self, id: &str) -> Option<&Arc<Instance<C>>> {
        self.instances.iter().find(|inst| inst.id() == id)
    }

    /// Returns all instances in the order they were added.
    pub fn instances(&self) -> &[Arc<Instance<C>>] {
        &self.instances
    }

    pub fn insert_instance(
        &mut self, instance: Arc<Instance<C>>
    ) -> Result<(), Error> {
        if self.instance(instance.id()).is_some() {
            return Err(Error::duplicate(Kind::Instance, instance.id()))
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Swaps an instance for a new one with the same id.
    ///
    /// Returns the old instance. The new one takes its position.
    pub fn replace_instance(
        &mut self, instance: Arc<Instance<C>>
    ) -> Result<Arc<Instance<C>>, Error> {
        match self.instances.iter_mut().find(|inst| {
            inst.id() == instance.id()
        }) {
            Some(slot) => Ok(std::mem::replace(slot, instance)),
            None => Err(Error::not_found(Kind::Instance, instance.id())),
        }
    }

    pub fn remove_instance(
        &mut self, id: &str
    ) -> Result<Arc<Instance<C>>, Error> {
        match self.instances.iter().position(|inst| inst.id() == id) {
            Some(pos) => Ok(self.instances.remove(pos)),
            None => Err(Error::not_found(Kind::Instance, id)),
        }
    }
}


//============ Tests =========================================================
