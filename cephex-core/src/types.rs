//! Domain types shared by the scrape pipeline and the exposition builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming::quote;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of a daemon: its admin-socket filename without the `.asok` extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DaemonName(pub String);

impl DaemonName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DaemonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DaemonName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DaemonName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Label sets
// ---------------------------------------------------------------------------

/// Exposition labels of one sample, keyed by label name.
///
/// Values are stored already quoted (`"osd.0"`), so rendering is a plain join.
/// Iteration is by label name, which keeps rendered output stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `name`, quoting and escaping it.
    pub fn insert(&mut self, name: impl Into<String>, value: &str) {
        self.0.insert(name.into(), quote(value));
    }

    /// Builder-style [`LabelSet::insert`].
    pub fn with(mut self, name: impl Into<String>, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    /// Merge `other` into `self`; labels in `other` win on name collisions.
    pub fn extend(&mut self, other: &LabelSet) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Merge `other` into `self`; labels already in `self` are kept.
    pub fn extend_missing(&mut self, other: &LabelSet) {
        for (name, value) in &other.0 {
            self.0
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// The quoted value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for LabelSet {
    /// `name1="v1",name2="v2"` with no trailing comma.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
