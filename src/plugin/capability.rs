use crate::commons::confstore::SubStore;


//------------ Capability ----------------------------------------------------

/// The part every pluggable implementation has in common.
///
/// Concrete capabilities such as
/// [`AuthManager`][crate::auth::AuthManager] or [`Job`][crate::jobs::Job]
/// extend this trait. An object is created by its class factory, then
/// initialized exactly once with its configuration before it becomes
/// reachable through the registry.
pub trait Capability: Send + Sync + 'static {
    /// Initializes a freshly constructed object.
    ///
    /// The sub store holds the persisted instance configuration. It is only
    /// valid for reading during this call; the object must copy what it
    /// needs.
    fn init(
        &mut self,
        instance_id: &str,
        plugin_id: &str,
        config: &SubStore,
    ) -> Result<(), String>;

    /// Releases whatever the object holds.
    ///
    /// Called once when the instance is replaced or removed. The object is
    /// not used again afterwards.
    fn shutdown(&self) -> Result<(), String> {
        Ok(())
    }
}
