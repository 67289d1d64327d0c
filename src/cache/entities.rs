//! Lazy views over artifact entities

use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// Entities of one loaded artifact, in the artifact's native order.
///
/// Objects yield `(id, entity)` pairs; arrays yield `(index, entity)`.
/// The view holds a shared reference to the value, so it can be iterated
/// any number of times without copying.
#[derive(Debug, Clone)]
pub struct Entities {
    kind: String,
    value: Arc<Value>,
}

impl Entities {
    pub(crate) fn new(kind: impl Into<String>, value: Arc<Value>) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    /// Artifact the entities belong to
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Fresh iterator from the first entity
    pub fn iter(&self) -> EntitiesIter<'_> {
        match self.value.as_ref() {
            Value::Object(map) => EntitiesIter::Object(map.iter()),
            Value::Array(items) => EntitiesIter::Array(items.iter().enumerate()),
            _ => EntitiesIter::Empty,
        }
    }

    /// Entity identifiers only
    pub fn ids(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        match self.value.as_ref() {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> IntoIterator for &'a Entities {
    type Item = (Cow<'a, str>, &'a Value);
    type IntoIter = EntitiesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(id, entity)` pairs
pub enum EntitiesIter<'a> {
    Object(serde_json::map::Iter<'a>),
    Array(std::iter::Enumerate<std::slice::Iter<'a, Value>>),
    Empty,
}

impl<'a> Iterator for EntitiesIter<'a> {
    type Item = (Cow<'a, str>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Object(iter) => iter.next().map(|(id, v)| (Cow::Borrowed(id.as_str()), v)),
            Self::Array(iter) => iter.next().map(|(i, v)| (Cow::Owned(i.to_string()), v)),
            Self::Empty => None,
        }
    }
}
