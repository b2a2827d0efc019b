//! Object keys.
//!
//! A key is the pair `(group_id, segment_name)`. Its composite form
//! `group_id/segment_name` is what gets hashed onto the ring and what a
//! node's `list` returns.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Address of one stored segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    group_id: String,
    segment_name: String,
}

impl ObjectKey {
    /// Validates and builds a key.
    ///
    /// Both parts must be non-empty, must not be `.` or `..`, and must not
    /// contain `/` or NUL: each part maps to one path component on disk.
    pub fn new(group_id: impl Into<String>, segment_name: impl Into<String>) -> Result<Self> {
        let group_id = group_id.into();
        let segment_name = segment_name.into();
        validate_part("group id", &group_id)?;
        validate_part("segment name", &segment_name)?;
        Ok(Self {
            group_id,
            segment_name,
        })
    }

    /// Parses the composite `group/segment` form.
    pub fn parse(composite: &str) -> Result<Self> {
        let (group_id, segment_name) = composite.rsplit_once('/').ok_or_else(|| {
            StoreError::InvalidKey(format!("{composite:?} is not of the form group/segment"))
        })?;
        Self::new(group_id, segment_name)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// `group_id/segment_name`, the string that is hashed for placement.
    pub fn composite(&self) -> String {
        format!("{}/{}", self.group_id, self.segment_name)
    }
}

fn validate_part(what: &str, part: &str) -> Result<()> {
    if part.is_empty() {
        return Err(StoreError::InvalidKey(format!("{what} is empty")));
    }
    if part == "." || part == ".." {
        return Err(StoreError::InvalidKey(format!("{what} {part:?} is reserved")));
    }
    if part.contains('/') || part.contains('\0') {
        return Err(StoreError::InvalidKey(format!(
            "{what} {part:?} contains a path separator or NUL"
        )));
    }
    Ok(())
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.segment_name)
    }
}

impl FromStr for ObjectKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
