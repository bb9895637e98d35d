//! Documents and identifiers

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::path::FieldPath;
use super::value::Value;
use super::ID_FIELD;
use crate::errors::{StoreError, StoreResult};

// =============================================================================
// Document ID
// =============================================================================

/// Unique, immutable identifier of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.0)
    }
}

// =============================================================================
// Document
// =============================================================================

/// An ordered mapping from field name to value.
///
/// Field order is insertion order. Replacing an existing field keeps its
/// position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object. Anything else is an invalid argument.
    pub fn from_json(json: JsonValue) -> StoreResult<Self> {
        match Value::from_json(json) {
            Value::Document(doc) => Ok(doc),
            other => Err(StoreError::invalid_argument(format!(
                "expected a document, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Builder form of `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// The `_id` field, if present and a string
    pub fn id(&self) -> Option<DocumentId> {
        self.get(ID_FIELD)
            .and_then(Value::as_str)
            .map(DocumentId::from)
    }

    /// Set `_id`, moving it to the first position
    pub fn set_id(&mut self, id: &DocumentId) {
        self.remove(ID_FIELD);
        self.fields
            .insert(0, (ID_FIELD.to_string(), Value::String(id.as_str().to_string())));
    }

    /// Nesting depth of this document (a flat document has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.values().map(Value::depth).max().unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Path access
    // -------------------------------------------------------------------------

    /// Resolve a dotted path. Traversing anything but a document yields
    /// `None`.
    pub fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get(segment)?.as_document()?;
        }
        current.get(last)
    }

    /// Convenience wrapper over `lookup` for unparsed paths
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        FieldPath::parse(path).ok().and_then(|p| self.lookup(&p))
    }

    /// Resolve a dotted path for mutation.
    ///
    /// Missing intermediates yield `Ok(None)`; an intermediate that exists but
    /// is not a document is a field path error.
    pub fn lookup_mut(&mut self, path: &FieldPath) -> StoreResult<Option<&mut Value>> {
        let last = last_segment(path);
        match self.parent_mut(path, false)? {
            Some(parent) => Ok(parent.get_mut(last)),
            None => Ok(None),
        }
    }

    /// Set the value at a dotted path, creating missing intermediate
    /// documents.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> StoreResult<Option<Value>> {
        let last = last_segment(path);
        match self.parent_mut(path, true)? {
            Some(parent) => Ok(parent.insert(last, value)),
            None => Err(StoreError::field_path(path.as_str(), "parent could not be created")),
        }
    }

    /// Remove the value at a dotted path. Removing a missing path is a no-op.
    pub fn remove_path(&mut self, path: &FieldPath) -> StoreResult<Option<Value>> {
        let last = last_segment(path);
        match self.parent_mut(path, false)? {
            Some(parent) => Ok(parent.remove(last)),
            None => Ok(None),
        }
    }

    fn parent_mut(&mut self, path: &FieldPath, create: bool) -> StoreResult<Option<&mut Document>> {
        let segments = path.segments();
        let parents = &segments[..segments.len().saturating_sub(1)];

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            if create && !current.contains_key(segment) {
                current.insert(segment.clone(), Document::new());
            }
            current = match current.get_mut(segment) {
                None => return Ok(None),
                Some(Value::Document(inner)) => inner,
                Some(other) => {
                    return Err(StoreError::field_path(
                        path.as_str(),
                        format!("'{}' is {}", path.prefix(depth + 1), other.type_name()),
                    ))
                }
            };
        }
        Ok(Some(current))
    }
}

fn last_segment(path: &FieldPath) -> &str {
    path.segments().last().map(String::as_str).unwrap_or_default()
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl TryFrom<JsonValue> for Document {
    type Error = StoreError;

    fn try_from(json: JsonValue) -> StoreResult<Self> {
        Document::from_json(json)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = JsonValue::deserialize(deserializer)?;
        Document::from_json(json).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: JsonValue) -> Document {
        Document::from_json(json).unwrap()
    }

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut d = Document::new().with("b", 1).with("a", 2);
        d.insert("b", 3);
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(d.get("b"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_lookup_nested() {
        let d = doc(json!({"address": {"state": "CA"}, "email": "john@x"}));
        assert_eq!(d.lookup(&path("address.state")), Some(&Value::from("CA")));
        assert_eq!(d.lookup(&path("address.city")), None);
        // traversing a string is a no-match
        assert_eq!(d.lookup(&path("email.domain")), None);
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let mut d = Document::new();
        d.set_path(&path("a.b.c"), Value::from(1)).unwrap();
        assert_eq!(d.to_json(), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut d = doc(json!({"a": 5}));
        let err = d.set_path(&path("a.b"), Value::from(1)).unwrap_err();
        assert!(matches!(err, StoreError::FieldPath { .. }));
    }

    #[test]
    fn test_remove_path_missing_is_noop() {
        let mut d = doc(json!({"a": {"b": 1}}));
        assert_eq!(d.remove_path(&path("x.y")).unwrap(), None);
        assert_eq!(d.remove_path(&path("a.b")).unwrap(), Some(Value::from(1)));
        assert_eq!(d.to_json(), json!({"a": {}}));
    }

    #[test]
    fn test_set_id_moves_to_front() {
        let mut d = doc(json!({"name": "A", "_id": "x"}));
        d.set_id(&DocumentId::new("y"));
        assert_eq!(d.keys().next(), Some("_id"));
        assert_eq!(d.id(), Some(DocumentId::new("y")));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
