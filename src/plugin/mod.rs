//! Pluggable implementations and their live instances.
//!
//! A subsystem, such as authentication or jobs, works with objects of one
//! capability. Implementations of the capability are classes in the
//! [`ClassCatalog`]. Registering a class under an id makes it a plugin and
//! creating a named, configured object from a plugin makes an instance.
//! [`Subsystem`] keeps both in step with the configuration store.

pub use self::capability::Capability;
pub use self::catalog::{ClassCatalog, ClassInfo, ClassLoadError, Factory, ParamInfo};
pub use self::error::{Error, Kind};
pub use self::instance::{Instance, InstanceState, Params};
pub use self::lifecycle::{LifecycleOutcome, Subsystem, SubsystemLayout};
pub use self::registry::{PluginDescriptor, PluginRegistry};

mod capability;
mod catalog;
mod error;
mod instance;
mod lifecycle;
mod registry;
