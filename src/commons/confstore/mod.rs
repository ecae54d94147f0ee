//! The hierarchical configuration store.
//!
//! Configuration is a tree of named sub stores holding string values. The
//! tree lives in memory and is written out as a whole on commit.

pub use self::node::{NameClash, Node};
pub use self::path::StorePath;
pub use self::segment::{ParseSegmentError, Segment, SegmentBuf};
pub use self::store::{ConfigStore, StoreError};
pub use self::substore::SubStore;

mod node;
mod path;
mod segment;
mod store;
mod substore;
