//! The address of a sub store.

use std::{fmt, str};
use super::segment::{ParseSegmentError, Segment, SegmentBuf};


//------------ StorePath -----------------------------------------------------

/// The path of a sub store inside the configuration tree.
///
/// A path consists of a sequence of zero or more segments. The empty path
/// refers to the root of the tree.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct StorePath {
    segments: Vec<SegmentBuf>,
}

impl StorePath {
    /// Creates a new path from a vec of segments.
    pub fn new(segments: Vec<SegmentBuf>) -> Self {
        StorePath { segments }
    }

    /// Creates the path of the root of the tree.
    pub fn root() -> Self {
        StorePath::new(Vec::new())
    }

    /// Creates a path from a single segment.
    pub fn from_segment(segment: impl Into<SegmentBuf>) -> Self {
        StorePath::new(vec![segment.into()])
    }

    /// Returns whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether the path is empty, i.e., the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment of the path, if any.
    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last().map(AsRef::as_ref)
    }

    /// Returns the path without its last segment.
    ///
    /// Returns `None` for the root path.
    pub fn parent(&self) -> Option<StorePath> {
        let (_, parent) = self.segments.split_last()?;
        Some(StorePath::new(parent.to_vec()))
    }

    /// Returns whether the path starts with a certain prefix.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        if prefix.segments.len() <= self.segments.len() {
            self.segments[0..prefix.segments.len()] == prefix.segments
        } else {
            false
        }
    }

    /// Creates a new path by adding a segment to the end of this path.
    pub fn sub_path(&self, segment: impl Into<SegmentBuf>) -> Self {
        let mut clone = self.clone();
        clone.segments.push(segment.into());
        clone
    }

    /// Returns an iterator over the segments.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().map(AsRef::as_ref)
    }
}


//--- FromStr, FromIterator

impl str::FromStr for StorePath {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(StorePath::root())
        }
        let segments = s
            .split(Segment::SEPARATOR)
            .map(SegmentBuf::from_str)
            .collect::<Result<_, _>>()?;
        Ok(StorePath { segments })
    }
}

impl FromIterator<SegmentBuf> for StorePath {
    fn from_iter<T: IntoIterator<Item = SegmentBuf>>(iter: T) -> Self {
        StorePath { segments: iter.into_iter().collect() }
    }
}


//--- Display

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if first {
                first = false;
            }
            else {
                write!(f, "{}", Segment::SEPARATOR)?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let path: StorePath = "auths.instance.ldap1".parse().unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_string(), "auths.instance.ldap1");
        assert_eq!(path.last_segment().unwrap().as_str(), "ldap1");
        assert_eq!(path.parent().unwrap().to_string(), "auths.instance");
    }

    #[test]
    fn empty_is_root() {
        let path: StorePath = "".parse().unwrap();
        assert!(path.is_root());
        assert!(path.parent().is_none());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn empty_segment_fails() {
        assert!("auths..ldap1".parse::<StorePath>().is_err());
    }

    #[test]
    fn starts_with() {
        let full: StorePath = "auths.instance.ldap1".parse().unwrap();
        let prefix: StorePath = "auths.instance".parse().unwrap();
        let other: StorePath = "jobsScheduler".parse().unwrap();
        assert!(full.starts_with(&prefix));
        assert!(full.starts_with(&StorePath::root()));
        assert!(!full.starts_with(&other));
        assert!(!prefix.starts_with(&full));
    }
}
