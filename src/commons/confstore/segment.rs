//! Names inside a configuration path.
//!
//! Configuration paths are written with dots, such as
//! `auths.instance.ldap1.host`. Every part between two dots is a
//! [`Segment`]. A segment names a sub store or a value and is used as a key
//! in the stored JSON, so it must be usable on its own: it is not empty,
//! carries no surrounding white space and never contains a dot.

use std::{borrow, error, fmt, mem, ops, str};


//------------ Segment -------------------------------------------------------

/// A borrowed configuration name.
#[derive(Debug, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct Segment(str);

impl Segment {
    /// The character separating segments in a path.
    pub const SEPARATOR: char = '.';

    /// Checks that a string is a valid segment.
    pub const fn parse(s: &str) -> Result<&Self, ParseSegmentError> {
        match check(s.as_bytes()) {
            Some(err) => Err(err),
            // SAFETY: Segment is a transparent wrapper around str.
            None => Ok(unsafe { mem::transmute::<&str, &Segment>(s) }),
        }
    }

    /// Creates a segment for a constant.
    ///
    /// Panics if the string isn’t a valid segment, which for a constant
    /// means compilation fails.
    pub const fn make(s: &str) -> &Self {
        match Self::parse(s) {
            Ok(segment) => segment,
            Err(_) => panic!("invalid configuration name constant"),
        }
    }

    pub const fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns the first problem with a segment, if any.
const fn check(bytes: &[u8]) -> Option<ParseSegmentError> {
    let len = bytes.len();
    if len == 0 {
        return Some(ParseSegmentError::Empty)
    }
    if bytes[0].is_ascii_whitespace() || bytes[len - 1].is_ascii_whitespace() {
        return Some(ParseSegmentError::Whitespace)
    }
    let mut pos = 0;
    while pos < len {
        if bytes[pos] == Segment::SEPARATOR as u8 {
            return Some(ParseSegmentError::Separator(pos))
        }
        pos += 1;
    }
    None
}

impl ToOwned for Segment {
    type Owned = SegmentBuf;

    fn to_owned(&self) -> SegmentBuf {
        SegmentBuf(self.0.into())
    }
}

impl AsRef<str> for Segment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//------------ SegmentBuf ----------------------------------------------------

/// An owned configuration name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SegmentBuf(String);

impl SegmentBuf {
    pub fn into_string(self) -> String {
        self.0
    }
}

impl ops::Deref for SegmentBuf {
    type Target = Segment;

    fn deref(&self) -> &Segment {
        // SAFETY: the string was checked when the value was created and
        // Segment is a transparent wrapper around str.
        unsafe { mem::transmute::<&str, &Segment>(self.0.as_str()) }
    }
}

impl AsRef<Segment> for SegmentBuf {
    fn as_ref(&self) -> &Segment {
        self
    }
}

impl borrow::Borrow<Segment> for SegmentBuf {
    fn borrow(&self) -> &Segment {
        self
    }
}

impl From<&Segment> for SegmentBuf {
    fn from(segment: &Segment) -> Self {
        segment.to_owned()
    }
}

impl TryFrom<String> for SegmentBuf {
    type Error = ParseSegmentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match check(s.as_bytes()) {
            Some(err) => Err(err),
            None => Ok(SegmentBuf(s)),
        }
    }
}

impl str::FromStr for SegmentBuf {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::parse(s).map(Segment::to_owned)
    }
}

impl fmt::Display for SegmentBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//------------ ParseSegmentError ---------------------------------------------

/// A string can’t be used as a configuration name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseSegmentError {
    /// The name is empty.
    Empty,

    /// The name starts or ends with white space.
    Whitespace,

    /// The name contains a dot at the given byte position.
    Separator(usize),
}

impl fmt::Display for ParseSegmentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseSegmentError::Empty => f.write_str("empty name"),
            ParseSegmentError::Whitespace => {
                f.write_str("name starts or ends with white space")
            }
            ParseSegmentError::Separator(pos) => {
                write!(f, "name contains '{}' at {}", Segment::SEPARATOR, pos)
            }
        }
    }
}

impl error::Error for ParseSegmentError { }


//============ Tests =========================================================
