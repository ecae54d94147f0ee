//! Keeping plugins and live instances in sync with their configuration.

use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, error, info, warn};
use crate::commons::confstore::{Node, Segment, SubStore};
use crate::constants::{PROP_CLASS, PROP_PLUGIN};
use super::capability::Capability;
use super::catalog::{ClassCatalog, ClassInfo, ClassLoadError};
use super::error::{Error, Kind};
use super::instance::{Instance, Params};
use super::registry::{PluginDescriptor, PluginRegistry};


//------------ SubsystemLayout -----------------------------------------------

/// Where a subsystem keeps its configuration below its root sub store.
#[derive(Clone, Copy, Debug)]
pub struct SubsystemLayout {
    /// The name used in log messages.
    pub name: &'static str,

    /// The sub store with one sub store per plugin.
    pub plugin_store: &'static Segment,

    /// The sub store with one sub store per instance.
    pub instance_store: &'static Segment,
}


//------------ LifecycleOutcome ----------------------------------------------

/// How a change that replaced or removed a live instance ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LifecycleOutcome {
    /// The change is complete and the old instance was shut down.
    Done,

    /// The change is complete but the old instance failed to shut down.
    ///
    /// Whatever it held may only be released by restarting the process.
    RestartRequired(String),
}

impl LifecycleOutcome {
    pub fn restart_required(&self) -> bool {
        matches!(self, LifecycleOutcome::RestartRequired(_))
    }
}


//------------ Subsystem -----------------------------------------------------

/// The plugins and instances of one capability.
///
/// All changes go through this type. They are serialized by a single lock
/// over the registry and applied to the configuration store first: only
/// when the new configuration has been committed and the new object has
/// been initialized does the registry change. If anything fails on the way,
/// the configuration below the subsystem root is restored to exactly what
/// it was before.
pub struct Subsystem<C: ?Sized> {
    layout: SubsystemLayout,
    root: SubStore,
    catalog: Arc<ClassCatalog>,
    registry: Mutex<PluginRegistry<C>>,
}

impl<C: ?Sized + Capability> Subsystem<C> {
    pub fn new(
        root: SubStore,
        layout: SubsystemLayout,
        catalog: Arc<ClassCatalog>,
    ) -> Self {
        Subsystem {
            layout, root, catalog,
            registry: Mutex::new(PluginRegistry::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.layout.name
    }

    /// Returns the root sub store of the subsystem.
    pub fn root(&self) -> &SubStore {
        &self.root
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, PluginRegistry<C>> {
        self.registry.lock().expect("poisoned lock")
    }
}

/// # Reading
impl<C: ?Sized + Capability> Subsystem<C> {
    pub fn plugin(&self, id: &str) -> Option<PluginDescriptor> {
        self.lock().lookup(id).cloned()
    }

    /// Returns all plugins in the order they were registered.
    pub fn plugins(&self) -> Vec<PluginDescriptor> {
        self.lock().list().to_vec()
    }

    /// Returns the description of the class behind a plugin.
    pub fn class_info(&self, plugin_id: &str) -> Result<ClassInfo, Error> {
        let plugin = self.plugin(plugin_id).ok_or_else(|| {
            Error::not_found(Kind::Plugin, plugin_id)
        })?;
        Ok(self.catalog.info::<C>(plugin.class_ref())?)
    }

    /// Returns the references of all classes usable for plugins.
    pub fn class_refs(&self) -> Vec<String> {
        self.catalog.class_refs::<C>()
    }

    pub fn instance(&self, id: &str) -> Option<Arc<Instance<C>>> {
        self.lock().instance(id).cloned()
    }

    /// Returns all instances in the order they were added.
    pub fn instances(&self) -> Vec<Arc<Instance<C>>> {
        self.lock().instances().to_vec()
    }
}

/// # Loading and shutting down
impl<C: ?Sized + Capability> Subsystem<C> {
    /// Rebuilds plugins and instances from the configuration store.
    ///
    /// Entries that cannot be used are logged and skipped but left in the
    /// store. Any instances that were live before are stopped.
    pub fn load(&self) -> Result<(), Error> {
        let mut registry = self.lock();
        let mut loaded = PluginRegistry::default();

        if let Some(plugins) = self.root.get_sub_store(
            self.layout.plugin_store.as_str()
        )? {
            for id in plugins.sub_store_names() {
                let class_ref = match plugins.get_sub_store(&id)? {
                    Some(plugin) => plugin.get(PROP_CLASS)?,
                    None => None,
                };
                let Some(class_ref) = class_ref else {
                    warn!(
                        "{}: plugin '{}' has no class, skipping",
                        self.layout.name, id
                    );
                    continue
                };
                if let Err(err) = self.catalog.info::<C>(&class_ref) {
                    error!(
                        "{}: skipping plugin '{}': {}",
                        self.layout.name, id, err
                    );
                    continue
                }
                loaded.register(&id, &class_ref)?;
            }
        }

        if let Some(instances) = self.root.get_sub_store(
            self.layout.instance_store.as_str()
        )? {
            for id in instances.sub_store_names() {
                let Some(config) = instances.get_sub_store(&id)? else {
                    continue
                };
                match self.load_instance(&loaded, &id, &config) {
                    Ok(instance) => {
                        loaded.insert_instance(Arc::new(instance))?;
                    }
                    Err(err) => {
                        error!(
                            "{}: skipping instance '{}': {}",
                            self.layout.name, id, err
                        );
                    }
                }
            }
        }

        info!(
            "{}: loaded {} plugin(s) and {} instance(s)",
            self.layout.name, loaded.list().len(), loaded.instances().len()
        );
        let old = std::mem::replace(&mut *registry, loaded);
        drop(registry);
        for instance in old.instances() {
            self.stop(instance);
        }
        Ok(())
    }

    fn load_instance(
        &self,
        registry: &PluginRegistry<C>,
        id: &str,
        config: &SubStore,
    ) -> Result<Instance<C>, Error> {
        let plugin_id = config.get(PROP_PLUGIN)?.ok_or_else(|| {
            Error::invalid_parameter(PROP_PLUGIN, "missing")
        })?;
        let plugin = registry.lookup(&plugin_id).ok_or_else(|| {
            Error::InvalidReference(plugin_id.clone())
        })?;
        let params = Params::from_pairs(
            config.values().into_iter().filter(|(key, _)| key != PROP_PLUGIN)
        )?;
        let object = self.construct(id, plugin, config)?;
        Ok(Instance::new(id.into(), plugin_id, params, object))
    }

    /// Stops all live instances.
    ///
    /// The instances stay registered.
    pub fn shutdown(&self) {
        let instances = self.instances();
        for instance in &instances {
            self.stop(instance);
        }
        debug!(
            "{}: shut down {} instance(s)", self.layout.name, instances.len()
        );
    }
}

/// # Plugins
impl<C: ?Sized + Capability> Subsystem<C> {
    /// Registers a new plugin for the given class.
    pub fn register_plugin(
        &self, id: &str, class_ref: &str
    ) -> Result<PluginDescriptor, Error> {
        let mut registry = self.lock();
        check_id(id)?;
        if registry.lookup(id).is_some() {
            return Err(Error::duplicate(Kind::Plugin, id))
        }
        self.catalog.info::<C>(class_ref)?;

        self.apply(|root| {
            let plugin = root
                .make_sub_store(self.layout.plugin_store.as_str())?
                .make_sub_store(id)?;
            plugin.put(PROP_CLASS, class_ref)?;
            Ok(())
        })?;
        registry.register(id, class_ref)?;
        info!(
            "{}: registered plugin '{}' for class {}",
            self.layout.name, id, class_ref
        );
        Ok(PluginDescriptor::new(id, class_ref))
    }

    /// Removes a plugin.
    ///
    /// Fails with [`Error::InUse`] while any instance refers to it.
    pub fn unregister_plugin(&self, id: &str) -> Result<(), Error> {
        let mut registry = self.lock();
        registry.check_unregister(id)?;

        self.apply(|root| {
            if let Some(plugins) = root.get_sub_store(
                self.layout.plugin_store.as_str()
            )? {
                plugins.remove_sub_store(id)?;
            }
            Ok(())
        })?;
        registry.unregister(id)?;
        info!("{}: unregistered plugin '{}'", self.layout.name, id);
        Ok(())
    }
}

/// # Instances
impl<C: ?Sized + Capability> Subsystem<C> {
    /// Creates, initializes and registers a new instance.
    pub fn add_instance(
        &self, id: &str, plugin_id: &str, params: Params
    ) -> Result<Arc<Instance<C>>, Error> {
        let mut registry = self.lock();
        check_id(id)?;
        if registry.instance(id).is_some() {
            return Err(Error::duplicate(Kind::Instance, id))
        }
        let plugin = registry.lookup(plugin_id).cloned().ok_or_else(|| {
            Error::InvalidReference(plugin_id.into())
        })?;

        let object = self.apply(|root| {
            let config = root
                .make_sub_store(self.layout.instance_store.as_str())?
                .make_sub_store(id)?;
            write_config(&config, plugin_id, &params)?;
            self.construct(id, &plugin, &config)
        })?;

        let instance = Arc::new(
            Instance::new(id.into(), plugin_id.into(), params, object)
        );
        registry.insert_instance(instance.clone())?;
        info!(
            "{}: added instance '{}' of plugin '{}'",
            self.layout.name, id, plugin_id
        );
        Ok(instance)
    }

    /// Replaces an instance with a new one built from new configuration.
    ///
    /// The old configuration is replaced as a whole. If anything fails,
    /// both the configuration and the live instance stay as they were. On
    /// success, the old instance is shut down.
    pub fn modify_instance(
        &self, id: &str, plugin_id: &str, params: Params
    ) -> Result<(Arc<Instance<C>>, LifecycleOutcome), Error> {
        let mut registry = self.lock();
        if registry.instance(id).is_none() {
            return Err(Error::not_found(Kind::Instance, id))
        }
        let plugin = registry.lookup(plugin_id).cloned().ok_or_else(|| {
            Error::InvalidReference(plugin_id.into())
        })?;

        let object = self.apply(|root| {
            let instances = root.make_sub_store(
                self.layout.instance_store.as_str()
            )?;
            instances.restore_sub_store(id, Some(Node::default()))?;
            let config = instances.make_sub_store(id)?;
            write_config(&config, plugin_id, &params)?;
            self.construct(id, &plugin, &config)
        })?;

        let instance = Arc::new(
            Instance::new(id.into(), plugin_id.into(), params, object)
        );
        let old = registry.replace_instance(instance.clone())?;
        drop(registry);
        info!(
            "{}: modified instance '{}', now using plugin '{}'",
            self.layout.name, id, plugin_id
        );
        Ok((instance, self.stop(&old)))
    }

    /// Removes an instance and its configuration and shuts it down.
    pub fn remove_instance(
        &self, id: &str
    ) -> Result<LifecycleOutcome, Error> {
        let mut registry = self.lock();
        if registry.instance(id).is_none() {
            return Err(Error::not_found(Kind::Instance, id))
        }

        self.apply(|root| {
            if let Some(instances) = root.get_sub_store(
                self.layout.instance_store.as_str()
            )? {
                instances.remove_sub_store(id)?;
            }
            Ok(())
        })?;
        let old = registry.remove_instance(id)?;
        drop(registry);
        info!("{}: removed instance '{}'", self.layout.name, id);
        Ok(self.stop(&old))
    }
}

/// # Configuration changes
impl<C: ?Sized + Capability> Subsystem<C> {
    /// Changes configuration below the subsystem root and commits it.
    ///
    /// This is for settings of the subsystem itself. The change is
    /// serialized with all plugin and instance changes and rolled back if
    /// `op` or the commit fails.
    pub fn update<T>(
        &self, op: impl FnOnce(&SubStore) -> Result<T, Error>
    ) -> Result<T, Error> {
        let _registry = self.lock();
        self.apply(op)
    }

    /// Runs `op` against the root and commits, or restores the root.
    ///
    /// Must be called with the registry locked.
    fn apply<T>(
        &self, op: impl FnOnce(&SubStore) -> Result<T, Error>
    ) -> Result<T, Error> {
        let _transaction = self.root.store().transaction();
        let saved = self.root.snapshot_self();
        let res = op(&self.root).and_then(|res| {
            self.root.commit(true).map_err(Error::CommitFailed)?;
            Ok(res)
        });
        if let Err(err) = &res {
            warn!(
                "{}: rolling back configuration after error: {}",
                self.layout.name, err
            );
            if let Err(err) = self.root.restore_self(saved) {
                error!(
                    "{}: failed to roll back configuration: {}",
                    self.layout.name, err
                );
            }
        }
        res
    }

    fn construct(
        &self, id: &str, plugin: &PluginDescriptor, config: &SubStore
    ) -> Result<Arc<C>, Error> {
        let mut object = self.catalog.construct::<C>(
            plugin.class_ref()
        ).map_err(|err| match err {
            ClassLoadError::Construction { err, .. } => {
                Error::ConstructionFailed { id: id.into(), err }
            }
            err => Error::ClassLoad(err),
        })?;
        object.init(id, plugin.id(), config).map_err(|err| {
            Error::InitFailed { id: id.into(), err }
        })?;
        Ok(Arc::from(object))
    }

    fn stop(&self, instance: &Instance<C>) -> LifecycleOutcome {
        match instance.stop() {
            Ok(()) => {
                debug!(
                    "{}: stopped instance '{}'",
                    self.layout.name, instance.id()
                );
                LifecycleOutcome::Done
            }
            Err(err) => {
                warn!(
                    "{}: instance '{}' failed to shut down: {}",
                    self.layout.name, instance.id(), err
                );
                LifecycleOutcome::RestartRequired(err)
            }
        }
    }
}


//------------ Helpers -------------------------------------------------------

fn check_id(id: &str) -> Result<(), Error> {
    Segment::parse(id).map(|_| ()).map_err(|err| {
        Error::invalid_parameter("id", err)
    })
}

fn write_config(
    config: &SubStore, plugin_id: &str, params: &Params
) -> Result<(), Error> {
    config.put(PROP_PLUGIN, plugin_id)?;
    for (name, value) in params.iter() {
        config.put(name, value)?;
    }
    Ok(())
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;
    use crate::commons::confstore::ConfigStore;
    use crate::plugin::InstanceState;

    static STOPPED: AtomicUsize = AtomicUsize::new(0);

    /// A capability whose behaviour is driven by its parameters.
    #[derive(Default)]
    struct Probe {
        host: String,
        fail_shutdown: bool,
    }

    impl Capability for Probe {
        fn init(
            &mut self, _id: &str, _plugin: &str, config: &SubStore
        ) -> Result<(), String> {
            if config.get_boolean("fail_init", false)
                .map_err(|err| err.to_string())?
            {
                return Err("told to fail".into())
            }
            self.host = config.get_string("host", "")
                .map_err(|err| err.to_string())?;
            self.fail_shutdown = config.get_boolean("fail_shutdown", false)
                .map_err(|err| err.to_string())?;
            Ok(())
        }

        fn shutdown(&self) -> Result<(), String> {
            STOPPED.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown {
                Err("stuck".into())
            }
            else {
                Ok(())
            }
        }
    }

    trait Other: Send + Sync { }

    const LAYOUT: SubsystemLayout = SubsystemLayout {
        name: "probes",
        plugin_store: Segment::make("impl"),
        instance_store: Segment::make("instance"),
    };

    fn catalog() -> Arc<ClassCatalog> {
        let catalog = ClassCatalog::new();
        catalog.register::<Probe>(
            "Probe", ClassInfo::new("probe"),
            || Ok(Box::new(Probe::default())),
        ).unwrap();
        catalog.register::<Probe>(
            "Broken", ClassInfo::new("broken"),
            || Err("cannot build".into()),
        ).unwrap();
        catalog.register::<dyn Other>(
            "Foreign", ClassInfo::new("wrong capability"),
            || Err("never".into()),
        ).unwrap();
        Arc::new(catalog)
    }

    fn subsystem(store: &ConfigStore) -> Subsystem<Probe> {
        let root = store.root().make_sub_store("probes").unwrap();
        let subsystem = Subsystem::new(root, LAYOUT, catalog());
        subsystem.register_plugin("probe", "Probe").unwrap();
        subsystem.register_plugin("broken", "Broken").unwrap();
        subsystem
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        Params::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn register_checks_class() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        assert!(matches!(
            subsystem.register_plugin("x", "Missing"),
            Err(Error::ClassLoad(ClassLoadError::NotFound(_)))
        ));
        assert!(matches!(
            subsystem.register_plugin("x", "Foreign"),
            Err(Error::ClassLoad(ClassLoadError::IllegalType { .. }))
        ));
        assert!(matches!(
            subsystem.register_plugin("probe", "Probe"),
            Err(Error::DuplicateId { kind: Kind::Plugin, .. })
        ));
        assert!(matches!(
            subsystem.register_plugin("a.b", "Probe"),
            Err(Error::InvalidParameter { .. })
        ));
        assert_eq!(
            store.root().get_sub_store("probes").unwrap().unwrap()
                .get_sub_store("impl").unwrap().unwrap().sub_store_names(),
            vec!["probe".to_string(), "broken".to_string()]
        );
    }

    #[test]
    fn add_persists_before_registering() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        let inst = subsystem.add_instance(
            "inst1", "probe", params(&[("host", "ldap1")])
        ).unwrap();
        assert_eq!(inst.object().host, "ldap1");
        assert_eq!(inst.state(), InstanceState::Active);

        let config = subsystem.root().get_sub_store("instance").unwrap()
            .unwrap().get_sub_store("inst1").unwrap().unwrap();
        assert_eq!(
            config.values(),
            vec![
                ("pluginName".to_string(), "probe".to_string()),
                ("host".to_string(), "ldap1".to_string()),
            ]
        );
    }

    #[test]
    fn failed_add_leaves_no_trace() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        let before = subsystem.root().snapshot_self();

        assert!(matches!(
            subsystem.add_instance("inst1", "nope", Params::new()),
            Err(Error::InvalidReference(_))
        ));
        assert!(matches!(
            subsystem.add_instance("inst1", "broken", Params::new()),
            Err(Error::ConstructionFailed { .. })
        ));
        assert!(matches!(
            subsystem.add_instance(
                "inst1", "probe", params(&[("fail_init", "true")])
            ),
            Err(Error::InitFailed { .. })
        ));
        assert_eq!(subsystem.root().snapshot_self(), before);
        assert!(subsystem.instance("inst1").is_none());
    }

    #[test]
    fn failed_modify_restores_everything() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        subsystem.add_instance(
            "inst1", "probe", params(&[("host", "ldap1"), ("port", "389")])
        ).unwrap();
        let before = subsystem.root().snapshot_self();

        assert!(matches!(
            subsystem.modify_instance(
                "inst1", "probe", params(&[("fail_init", "true")])
            ),
            Err(Error::InitFailed { .. })
        ));
        assert!(matches!(
            subsystem.modify_instance("inst1", "broken", Params::new()),
            Err(Error::ConstructionFailed { .. })
        ));
        assert_eq!(subsystem.root().snapshot_self(), before);

        let inst = subsystem.instance("inst1").unwrap();
        assert_eq!(inst.object().host, "ldap1");
        assert_eq!(inst.state(), InstanceState::Active);
    }

    #[test]
    fn modify_replaces_and_stops_old() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        let old = subsystem.add_instance(
            "inst1", "probe", params(&[("host", "ldap1"), ("port", "389")])
        ).unwrap();
        subsystem.add_instance("inst2", "probe", Params::new()).unwrap();

        let (new, outcome) = subsystem.modify_instance(
            "inst1", "probe", params(&[("host", "ldap2")])
        ).unwrap();
        assert_eq!(outcome, LifecycleOutcome::Done);
        assert_eq!(old.state(), InstanceState::Stopped);
        assert_eq!(new.object().host, "ldap2");

        // Replaced wholesale and in place.
        let instances = subsystem.root().get_sub_store("instance").unwrap()
            .unwrap();
        assert_eq!(
            instances.sub_store_names(), vec!["inst1", "inst2"]
        );
        let config = instances.get_sub_store("inst1").unwrap().unwrap();
        assert!(config.get("port").unwrap().is_none());
        assert_eq!(subsystem.instances()[0].object().host, "ldap2");
    }

    #[test]
    fn failing_shutdown_requires_restart() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        let before = STOPPED.load(Ordering::SeqCst);
        subsystem.add_instance(
            "inst1", "probe", params(&[("fail_shutdown", "true")])
        ).unwrap();
        let outcome = subsystem.remove_instance("inst1").unwrap();
        assert!(outcome.restart_required());
        assert!(STOPPED.load(Ordering::SeqCst) > before);
        assert!(subsystem.instance("inst1").is_none());
        assert!(matches!(
            subsystem.remove_instance("inst1"),
            Err(Error::NotFound { kind: Kind::Instance, .. })
        ));
    }

    #[test]
    fn unregister_in_use() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        subsystem.add_instance("inst1", "probe", Params::new()).unwrap();
        let before = subsystem.root().snapshot_self();
        assert!(matches!(
            subsystem.unregister_plugin("probe"), Err(Error::InUse { .. })
        ));
        assert_eq!(subsystem.root().snapshot_self(), before);
        assert!(subsystem.plugin("probe").is_some());

        subsystem.remove_instance("inst1").unwrap();
        subsystem.unregister_plugin("probe").unwrap();
        assert!(subsystem.plugin("probe").is_none());
    }

    #[test]
    fn failed_commit_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let uri = Url::parse(&format!(
            "local://{}", store_dir.join("cs.json").display()
        )).unwrap();
        let store = ConfigStore::open(&uri).unwrap();
        let subsystem = subsystem(&store);
        let before = subsystem.root().snapshot_self();
        let committed = store.export();

        std::fs::remove_dir_all(&store_dir).unwrap();
        assert!(matches!(
            subsystem.add_instance("inst1", "probe", Params::new()),
            Err(Error::CommitFailed(_))
        ));
        assert_eq!(subsystem.root().snapshot_self(), before);
        assert_eq!(store.export(), committed);
        assert!(subsystem.instance("inst1").is_none());
    }

    #[test]
    fn load_rebuilds_and_skips_broken() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        subsystem.add_instance(
            "inst1", "probe", params(&[("host", "ldap1")])
        ).unwrap();

        // An instance that cannot be initialized any more.
        let instances = subsystem.root().get_sub_store("instance").unwrap()
            .unwrap();
        let bad = instances.make_sub_store("inst2").unwrap();
        bad.put("pluginName", "probe").unwrap();
        bad.put("fail_init", "true").unwrap();

        let reloaded = Subsystem::<Probe>::new(
            subsystem.root().clone(), LAYOUT, catalog()
        );
        reloaded.load().unwrap();
        assert_eq!(reloaded.plugins().len(), 2);
        assert_eq!(reloaded.instances().len(), 1);
        assert_eq!(
            reloaded.instance("inst1").unwrap().params().get("host"),
            Some("ldap1")
        );
        assert!(instances.get_sub_store("inst2").unwrap().is_some());
    }

    #[test]
    fn update_rolls_back_on_error() {
        let store = ConfigStore::memory();
        let subsystem = subsystem(&store);
        let before = subsystem.root().snapshot_self();
        let res: Result<(), Error> = subsystem.update(|root| {
            root.put("interval", "5")?;
            Err(Error::invalid_parameter("enabled", "not a boolean"))
        });
        assert!(res.is_err());
        assert_eq!(subsystem.root().snapshot_self(), before);
    }
}
