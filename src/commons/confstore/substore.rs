//! Handles on parts of the configuration tree.

use std::fmt;
use std::str::FromStr;
use super::node::Node;
use super::path::StorePath;
use super::segment::{Segment, SegmentBuf};
use super::store::{ConfigStore, StoreError};


//------------ SubStore ------------------------------------------------------

/// A handle on a named scope of the configuration tree.
///
/// A sub store handle is just a path into the store. It can outlive the
/// sub store it refers to: reading from a removed sub store returns
/// nothing, writing to it fails with [`StoreError::MissingSubStore`].
#[derive(Clone)]
pub struct SubStore {
    store: ConfigStore,
    path: StorePath,
}

impl SubStore {
    pub(super) fn new(store: ConfigStore, path: StorePath) -> Self {
        SubStore { store, path }
    }

    /// Returns the path of this sub store.
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Returns the store this sub store belongs to.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Returns whether the sub store currently exists.
    pub fn exists(&self) -> bool {
        self.store.with_tree(|tree| tree.node(&self.path).is_some())
    }

    /// Commits the whole store this sub store is part of.
    pub fn commit(&self, sync: bool) -> Result<(), StoreError> {
        self.store.commit(sync)
    }

    fn read<T>(&self, op: impl FnOnce(&Node) -> T) -> Option<T> {
        self.store.with_tree(|tree| tree.node(&self.path).map(op))
    }

    fn write<T>(
        &self, op: impl FnOnce(&mut Node) -> Result<T, StoreError>
    ) -> Result<T, StoreError> {
        self.store.with_tree(|tree| {
            match tree.node_mut(&self.path) {
                Some(node) => op(node),
                None => Err(StoreError::MissingSubStore(self.path.clone()))
            }
        })
    }
}

/// # Sub stores
impl SubStore {
    /// Returns the child sub store with the given name if it exists.
    pub fn get_sub_store(
        &self, name: &str
    ) -> Result<Option<SubStore>, StoreError> {
        let name = Segment::parse(name)?;
        let exists = self.read(|node| node.child(name).is_some());
        Ok(exists.unwrap_or(false).then(|| self.child(name)))
    }

    /// Returns the child sub store with the given name, creating it if
    /// necessary.
    pub fn make_sub_store(&self, name: &str) -> Result<SubStore, StoreError> {
        let name = Segment::parse(name)?;
        self.write(|node| {
            node.make_child(name).map(|_| ()).map_err(|clash| {
                StoreError::clash(&self.path, clash)
            })
        })?;
        Ok(self.child(name))
    }

    /// Removes the child sub store with the given name.
    ///
    /// Returns whether there was such a sub store.
    pub fn remove_sub_store(&self, name: &str) -> Result<bool, StoreError> {
        let name = Segment::parse(name)?;
        Ok(
            self.store.with_tree(|tree| {
                tree.node_mut(&self.path).and_then(|node| {
                    node.remove_child(name)
                })
            }).is_some()
        )
    }

    /// Returns the names of all child sub stores in insertion order.
    pub fn sub_store_names(&self) -> Vec<String> {
        self.read(|node| {
            node.children().map(|(name, _)| name.as_str().into()).collect()
        }).unwrap_or_default()
    }

    /// Returns a copy of the child sub store with the given name.
    ///
    /// Returns `None` if the child doesn’t exist. Use this together with
    /// [`restore_sub_store`][Self::restore_sub_store] to undo changes.
    pub fn snapshot(&self, name: &str) -> Result<Option<Node>, StoreError> {
        let name = Segment::parse(name)?;
        Ok(self.read(|node| node.child(name).cloned()).flatten())
    }

    /// Replaces the child sub store with the given name with a snapshot.
    ///
    /// If the snapshot is `None`, the child is removed. This is a full
    /// overwrite: nothing of the current child content survives.
    pub fn restore_sub_store(
        &self, name: &str, snapshot: Option<Node>
    ) -> Result<(), StoreError> {
        match snapshot {
            Some(snapshot) => {
                let name = Segment::parse(name)?;
                self.write(|node| {
                    node.replace_child(name, snapshot).map_err(|clash| {
                        StoreError::clash(&self.path, clash)
                    })
                })
            }
            None => self.remove_sub_store(name).map(|_| ())
        }
    }

    /// Returns a copy of this sub store.
    ///
    /// Returns `None` if the sub store doesn’t exist.
    pub fn snapshot_self(&self) -> Option<Node> {
        self.read(Node::clone)
    }

    /// Replaces this sub store with a snapshot.
    ///
    /// If the snapshot is `None`, the sub store is removed. Restoring the
    /// root replaces the whole tree.
    pub fn restore_self(
        &self, snapshot: Option<Node>
    ) -> Result<(), StoreError> {
        let (parent, name) = match (
            self.path.parent(), self.path.last_segment()
        ) {
            (Some(parent), Some(name)) => (parent, SegmentBuf::from(name)),
            _ => {
                self.store.with_tree(|tree| {
                    *tree = snapshot.unwrap_or_default()
                });
                return Ok(())
            }
        };
        self.store.with_tree(|tree| {
            match (tree.node_mut(&parent), snapshot) {
                (Some(node), Some(snapshot)) => {
                    node.replace_child(&name, snapshot).map_err(|clash| {
                        StoreError::clash(&parent, clash)
                    })
                }
                (Some(node), None) => {
                    node.remove_child(&name);
                    Ok(())
                }
                (None, Some(_)) => Err(StoreError::MissingSubStore(parent)),
                (None, None) => Ok(()),
            }
        })
    }

    fn child(&self, name: &Segment) -> SubStore {
        SubStore::new(
            self.store.clone(), self.path.sub_path(SegmentBuf::from(name))
        )
    }
}

/// # Values
impl SubStore {
    /// Returns the value of the given key.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = Segment::parse(key)?;
        Ok(self.read(|node| node.value(key).map(Into::into)).flatten())
    }

    /// Sets the value of the given key.
    pub fn put(
        &self, key: &str, value: impl Into<String>
    ) -> Result<(), StoreError> {
        let key = Segment::parse(key)?;
        let value = value.into();
        self.write(|node| {
            node.set_value(key, value).map_err(|clash| {
                StoreError::clash(&self.path, clash)
            })
        })
    }

    /// Removes a value and returns it.
    pub fn remove(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = Segment::parse(key)?;
        Ok(
            self.store.with_tree(|tree| {
                tree.node_mut(&self.path).and_then(|node| {
                    node.remove_value(key)
                })
            })
        )
    }

    /// Returns all values in insertion order.
    pub fn values(&self) -> Vec<(String, String)> {
        self.read(|node| {
            node.values().map(|(key, value)| {
                (key.as_str().into(), value.into())
            }).collect()
        }).unwrap_or_default()
    }

    /// Returns a string value or the default if the key is not present.
    pub fn get_string(
        &self, key: &str, default: &str
    ) -> Result<String, StoreError> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Returns an integer value or the default if the key is not present.
    pub fn get_integer(
        &self, key: &str, default: i64
    ) -> Result<i64, StoreError> {
        self.get_parsed(key, default, "an integer")
    }

    /// Returns a boolean value or the default if the key is not present.
    ///
    /// Only `true` and `false` are accepted.
    pub fn get_boolean(
        &self, key: &str, default: bool
    ) -> Result<bool, StoreError> {
        self.get_parsed(key, default, "a boolean")
    }

    fn get_parsed<T: FromStr>(
        &self, key: &str, default: T, expected: &'static str,
    ) -> Result<T, StoreError> {
        match self.get(key)? {
            Some(value) => {
                T::from_str(value.trim()).map_err(|_| {
                    StoreError::InvalidValue {
                        path: self.path.clone(),
                        key: key.into(),
                        value,
                        expected,
                    }
                })
            }
            None => Ok(default)
        }
    }
}


//--- Debug

impl fmt::Debug for SubStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SubStore").field(&self.path.to_string()).finish()
    }
}


//============ Tests =========================================================
