use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::value::Value;

/// One concrete assignment of values to the declared variables.
///
/// Entries keep insertion order for reporting; equality and hashing ignore it.
/// A candidate is never mutated after construction: [`with`](Self::with)
/// returns a modified copy.
#[derive(Debug, Clone, Default)]
pub struct CandidatePoint {
    entries: Vec<(String, Value)>,
}

impl CandidatePoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut point = Self::new();
        for (name, value) in entries {
            point.insert(name.into(), value);
        }
        point
    }

    /// Builder-style insert used while a strategy assembles a fresh point.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into());
        self
    }

    fn insert(&mut self, name: String, value: Value) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Copy of this point with `name` set to `value`.
    pub fn with(&self, name: &str, value: Value) -> Self {
        let mut copy = self.clone();
        copy.insert(name.to_string(), value);
        copy
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn sorted(&self) -> Vec<&(String, Value)> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
    }
}

impl PartialEq for CandidatePoint {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Eq for CandidatePoint {}

impl Hash for CandidatePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (name, value) in self.sorted() {
            name.hash(state);
            value.hash(state);
        }
    }
}

impl fmt::Display for CandidatePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for CandidatePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
