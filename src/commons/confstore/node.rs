//! The in-memory configuration tree.

use std::fmt;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use super::path::StorePath;
use super::segment::{Segment, SegmentBuf};


//------------ Node ----------------------------------------------------------

/// A node of the configuration tree.
///
/// A node holds string values and child nodes, both in insertion order.
/// A name is used either for a value or for a child node, never both.
///
/// On disk a node is a JSON object in which values are strings and child
/// nodes are nested objects.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Node {
    values: Vec<(SegmentBuf, String)>,
    children: Vec<(SegmentBuf, Node)>,
}

/// # Reading
impl Node {
    /// Returns whether the node has neither values nor children.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }

    /// Returns the value with the given name.
    pub fn value(&self, name: &Segment) -> Option<&str> {
        self.values.iter().find_map(|(key, value)| {
            (key.as_ref() == name).then_some(value.as_str())
        })
    }

    /// Returns all values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&Segment, &str)> {
        self.values.iter().map(|(key, value)| {
            (key.as_ref(), value.as_str())
        })
    }

    /// Returns the child with the given name.
    pub fn child(&self, name: &Segment) -> Option<&Node> {
        self.children.iter().find_map(|(key, node)| {
            (key.as_ref() == name).then_some(node)
        })
    }

    /// Returns all children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&Segment, &Node)> {
        self.children.iter().map(|(key, node)| (key.as_ref(), node))
    }

    /// Returns the node at the given path relative to this node.
    pub fn node(&self, path: &StorePath) -> Option<&Node> {
        let mut node = self;
        for segment in path.iter() {
            node = node.child(segment)?;
        }
        Some(node)
    }

    fn has_value(&self, name: &Segment) -> bool {
        self.values.iter().any(|(key, _)| key.as_ref() == name)
    }

    fn has_child(&self, name: &Segment) -> bool {
        self.children.iter().any(|(key, _)| key.as_ref() == name)
    }
}

/// # Writing
impl Node {
    /// Sets a value.
    ///
    /// An existing value keeps its position, a new one is appended. Fails
    /// if the name is used by a child.
    pub fn set_value(
        &mut self, name: &Segment, value: String
    ) -> Result<(), NameClash> {
        if self.has_child(name) {
            return Err(NameClash(name.to_owned()))
        }
        match self.values.iter_mut().find(|(key, _)| key.as_ref() == name) {
            Some((_, old)) => *old = value,
            None => self.values.push((name.to_owned(), value)),
        }
        Ok(())
    }

    /// Removes a value and returns it.
    pub fn remove_value(&mut self, name: &Segment) -> Option<String> {
        let pos = self.values.iter().position(|(key, _)| {
            key.as_ref() == name
        })?;
        Some(self.values.remove(pos).1)
    }

    /// Returns a mutable reference to a child.
    pub fn child_mut(&mut self, name: &Segment) -> Option<&mut Node> {
        self.children.iter_mut().find_map(|(key, node)| {
            (key.as_ref() == name).then_some(node)
        })
    }

    /// Returns the child with the given name, creating it if necessary.
    ///
    /// Fails if the name is used by a value.
    pub fn make_child(
        &mut self, name: &Segment
    ) -> Result<&mut Node, NameClash> {
        if self.has_value(name) {
            return Err(NameClash(name.to_owned()))
        }
        let pos = match self.children.iter().position(|(key, _)| {
            key.as_ref() == name
        }) {
            Some(pos) => pos,
            None => {
                self.children.push((name.to_owned(), Node::default()));
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[pos].1)
    }

    /// Replaces a child wholesale or adds it if it doesn’t exist.
    pub fn replace_child(
        &mut self, name: &Segment, node: Node
    ) -> Result<(), NameClash> {
        *self.make_child(name)? = node;
        Ok(())
    }

    /// Removes a child and returns it.
    pub fn remove_child(&mut self, name: &Segment) -> Option<Node> {
        let pos = self.children.iter().position(|(key, _)| {
            key.as_ref() == name
        })?;
        Some(self.children.remove(pos).1)
    }

    /// Returns a mutable reference to the node at a relative path.
    pub fn node_mut(&mut self, path: &StorePath) -> Option<&mut Node> {
        let mut node = self;
        for segment in path.iter() {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }
}


//--- Serialize and Deserialize

impl Serialize for Node {
    fn serialize<S: Serializer>(
        &self, serializer: S
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(
            Some(self.values.len() + self.children.len())
        )?;
        for (key, value) in &self.values {
            map.serialize_entry(key.as_str(), value)?;
        }
        for (key, node) in &self.children {
            map.serialize_entry(key.as_str(), node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D
    ) -> Result<Self, D::Error> {
        deserializer.deserialize_map(NodeVisitor)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NodeEntry {
    Value(String),
    Child(Node),
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a configuration object")
    }

    fn visit_map<A: MapAccess<'de>>(
        self, mut access: A
    ) -> Result<Self::Value, A::Error> {
        let mut node = Node::default();
        while let Some((key, entry)) = access.next_entry::<String, NodeEntry>()? {
            let name = SegmentBuf::try_from(key).map_err(de::Error::custom)?;
            let res = match entry {
                NodeEntry::Value(value) => node.set_value(&name, value),
                NodeEntry::Child(child) => node.replace_child(&name, child),
            };
            res.map_err(de::Error::custom)?;
        }
        Ok(node)
    }
}


//------------ NameClash -----------------------------------------------------

/// A name was used for a value and a child at the same time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameClash(pub SegmentBuf);

impl fmt::Display for NameClash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' is used for both a value and a sub store", self.0)
    }
}


//============ Tests =========================================================
