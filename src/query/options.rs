//! Query options
//!
//! Sort specifications, projections and the find-and-modify return mode.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::document::{json_type, Document, FieldPath, Value, ID_FIELD};
use crate::errors::{StoreError, StoreResult};

// =============================================================================
// Sort
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// `1` is ascending, `-1` descending
    fn from_json(field: &str, value: &JsonValue) -> StoreResult<Self> {
        match value.as_i64() {
            Some(1) => Ok(SortDirection::Asc),
            Some(-1) => Ok(SortDirection::Desc),
            _ => Err(StoreError::invalid_argument(format!(
                "sort direction for '{}' must be 1 or -1",
                field
            ))),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by
    pub field: FieldPath,
    /// Sort direction
    pub direction: SortDirection,
}

/// Sort specification: earlier keys dominate later ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn asc(field: &str) -> StoreResult<Self> {
        Self::single(field, SortDirection::Asc)
    }

    pub fn desc(field: &str) -> StoreResult<Self> {
        Self::single(field, SortDirection::Desc)
    }

    fn single(field: &str, direction: SortDirection) -> StoreResult<Self> {
        Ok(Self {
            keys: vec![SortKey {
                field: FieldPath::parse(field)?,
                direction,
            }],
        })
    }

    /// Append a tie-breaking key
    pub fn then(mut self, field: &str, direction: SortDirection) -> StoreResult<Self> {
        self.keys.push(SortKey {
            field: FieldPath::parse(field)?,
            direction,
        });
        Ok(self)
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Parse `{"age": 1, "name": -1}`
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let obj = json.as_object().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "sort must be a document, found {}",
                json_type(json)
            ))
        })?;
        if obj.is_empty() {
            return Err(StoreError::invalid_argument("sort must name at least one field"));
        }

        let keys = obj
            .iter()
            .map(|(field, dir)| {
                Ok(SortKey {
                    field: FieldPath::parse(field)?,
                    direction: SortDirection::from_json(field, dir)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Self { keys })
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Inclusion projection.
///
/// Retains the listed fields; `_id` is dropped unless explicitly included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<FieldPath>,
    include_id: bool,
}

impl Projection {
    /// Retain the given fields (dotted paths allowed), dropping `_id`
    pub fn include(fields: &[&str]) -> StoreResult<Self> {
        let mut projection = Self {
            fields: Vec::with_capacity(fields.len()),
            include_id: false,
        };
        for field in fields {
            let path = FieldPath::parse(field)?;
            if path.is_id() {
                projection.include_id = true;
            } else {
                projection.push_field(path)?;
            }
        }
        Ok(projection)
    }

    /// Keep `_id` in the output
    pub fn with_id(mut self) -> Self {
        self.include_id = true;
        self
    }

    /// Parse `{"firstName": 1, "lastName": 1, "_id": 0}`
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let obj = json.as_object().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "projection must be a document, found {}",
                json_type(json)
            ))
        })?;

        let mut projection = Self {
            fields: Vec::new(),
            include_id: false,
        };
        for (field, flag) in obj {
            let included = match flag {
                JsonValue::Bool(b) => *b,
                JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                other => {
                    return Err(StoreError::invalid_argument(format!(
                        "projection value for '{}' must be 0/1 or a boolean, found {}",
                        field,
                        json_type(other)
                    )))
                }
            };

            let path = FieldPath::parse(field)?;
            if path.is_id() {
                projection.include_id = included;
            } else if included {
                projection.push_field(path)?;
            } else {
                return Err(StoreError::invalid_argument(format!(
                    "exclusion of '{}' is not supported; only '_id' may be excluded",
                    field
                )));
            }
        }
        Ok(projection)
    }

    fn push_field(&mut self, path: FieldPath) -> StoreResult<()> {
        if let Some(existing) = self.fields.iter().find(|f| f.overlaps(&path)) {
            return Err(StoreError::invalid_argument(format!(
                "projection paths '{}' and '{}' collide",
                existing, path
            )));
        }
        self.fields.push(path);
        Ok(())
    }

    /// Build the projected document
    pub fn apply(&self, document: &Document) -> Document {
        let mut projected = Document::new();
        if self.include_id {
            if let Some(id) = document.get(ID_FIELD) {
                projected.insert(ID_FIELD, id.clone());
            }
        }
        for path in &self.fields {
            if let Some(value) = document.lookup(path) {
                place(&mut projected, path.segments(), value.clone());
            }
        }
        projected
    }
}

/// Write a value at a segment path, creating intermediate documents
fn place(target: &mut Document, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            if !matches!(target.get(head), Some(Value::Document(_))) {
                target.insert(head.clone(), Document::new());
            }
            if let Some(Value::Document(inner)) = target.get_mut(head) {
                place(inner, rest, value);
            }
        }
    }
}

// =============================================================================
// Find options
// =============================================================================

/// Options for `Collection::find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Which document a find-and-modify operation returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    /// The document as it was before the modification
    #[default]
    Before,
    /// The document as it is after the modification
    After,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_parse() {
        let sort = SortSpec::parse(&json!({"age": 1, "name": -1})).unwrap();
        assert_eq!(sort.keys().len(), 2);
        assert_eq!(sort.keys()[0].field.as_str(), "age");
        assert_eq!(sort.keys()[1].direction, SortDirection::Desc);

        assert!(SortSpec::parse(&json!({"age": 2})).is_err());
        assert!(SortSpec::parse(&json!({})).is_err());
        assert!(SortSpec::parse(&json!(["age"])).is_err());
    }

    #[test]
    fn test_projection_drops_id_by_default() {
        let doc = Document::from_json(json!({"_id": "1", "firstName": "A", "lastName": "B", "age": 3, "email": "x"})).unwrap();
        let projection = Projection::include(&["firstName", "lastName", "age"]).unwrap();
        assert_eq!(
            projection.apply(&doc).to_json(),
            json!({"firstName": "A", "lastName": "B", "age": 3})
        );
        assert_eq!(
            projection.with_id().apply(&doc).to_json(),
            json!({"_id": "1", "firstName": "A", "lastName": "B", "age": 3})
        );
    }

    #[test]
    fn test_projection_parse() {
        let p = Projection::parse(&json!({"firstName": 1, "lastName": 1, "age": 1, "_id": 0})).unwrap();
        assert_eq!(p, Projection::include(&["firstName", "lastName", "age"]).unwrap());

        let p = Projection::parse(&json!({"name": true, "_id": 1})).unwrap();
        assert_eq!(p, Projection::include(&["name", "_id"]).unwrap());

        assert!(Projection::parse(&json!({"email": 0})).is_err());
        assert!(Projection::parse(&json!({"address": 1, "address.state": 1})).is_err());
        assert!(Projection::parse(&json!({"email": "yes"})).is_err());
    }

    #[test]
    fn test_projection_nested_and_missing() {
        let doc = Document::from_json(json!({"_id": "1", "address": {"state": "CA", "city": "LA"}})).unwrap();
        let projection = Projection::include(&["address.state", "phone"]).unwrap();
        assert_eq!(projection.apply(&doc).to_json(), json!({"address": {"state": "CA"}}));
    }

    #[test]
    fn test_return_mode_serde() {
        let mode: ReturnMode = serde_json::from_value(json!("after")).unwrap();
        assert_eq!(mode, ReturnMode::After);
        assert_eq!(ReturnMode::default(), ReturnMode::Before);
    }
}
