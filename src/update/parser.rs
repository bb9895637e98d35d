//! Update parsing
//!
//! ```text
//! {"$set": {"skills": []}}
//! {"$addToSet": {"skills": {"$each": ["js", "git"]}}}
//! {"$pull": {"tags": {"$in": ["tag2", "tag1-a"]}}}
//! {"$unset": {"department": ""}}
//! ```

use serde_json::{Map, Value as JsonValue};

use crate::document::{json_type, Value};
use crate::errors::{StoreError, StoreResult};

use super::ast::{Directive, PullCondition, UpdateSpec};

impl UpdateSpec {
    /// Parse an operator update document
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let obj = json.as_object().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "update must be a document, found {}",
                json_type(json)
            ))
        })?;

        let mut directives = Vec::new();
        for (op, operand) in obj {
            let fields = operand_fields(op, operand)?;
            for (field, value) in fields {
                let directive = match op.as_str() {
                    "$set" => Directive::set(field, Value::from_json(value.clone()))?,
                    "$unset" => Directive::unset(field)?,
                    "$addToSet" => Directive::add_to_set(field, parse_each(value)?)?,
                    "$pull" => Directive::pull(field, parse_pull(value)?)?,
                    other => {
                        return Err(StoreError::invalid_argument(format!(
                            "unknown update operator '{}'",
                            other
                        )))
                    }
                };
                directives.push(directive);
            }
        }

        UpdateSpec::new(directives)
    }
}

fn operand_fields<'a>(op: &str, operand: &'a JsonValue) -> StoreResult<&'a Map<String, JsonValue>> {
    match op {
        "$set" | "$unset" | "$addToSet" | "$pull" => {}
        other if other.starts_with('$') => {
            return Err(StoreError::invalid_argument(format!(
                "unknown update operator '{}'",
                other
            )))
        }
        other => {
            return Err(StoreError::invalid_argument(format!(
                "update documents may only contain operators, found field '{}'; use a replacement instead",
                other
            )))
        }
    }

    operand.as_object().ok_or_else(|| {
        StoreError::invalid_argument(format!(
            "{} requires a document, found {}",
            op,
            json_type(operand)
        ))
    })
}

/// `"b"` or `{"$each": ["js", "git"]}`
fn parse_each(value: &JsonValue) -> StoreResult<Vec<Value>> {
    match single_operator(value)? {
        Some(("$each", JsonValue::Array(items))) => {
            Ok(items.iter().cloned().map(Value::from_json).collect())
        }
        Some(("$each", other)) => Err(StoreError::invalid_argument(format!(
            "$each requires an array, found {}",
            json_type(other)
        ))),
        Some((op, _)) => Err(StoreError::invalid_argument(format!(
            "unsupported $addToSet modifier '{}'",
            op
        ))),
        None => Ok(vec![Value::from_json(value.clone())]),
    }
}

/// `"c"` or `{"$in": ["tag2", "tag1-a"]}`
fn parse_pull(value: &JsonValue) -> StoreResult<PullCondition> {
    match single_operator(value)? {
        Some(("$in", JsonValue::Array(items))) => Ok(PullCondition::In(
            items.iter().cloned().map(Value::from_json).collect(),
        )),
        Some(("$in", other)) => Err(StoreError::invalid_argument(format!(
            "$in requires an array, found {}",
            json_type(other)
        ))),
        Some((op, _)) => Err(StoreError::invalid_argument(format!(
            "unsupported $pull condition '{}'",
            op
        ))),
        None => Ok(PullCondition::Equals(Value::from_json(value.clone()))),
    }
}

/// Detect a `{"$op": operand}` modifier document
fn single_operator(value: &JsonValue) -> StoreResult<Option<(&str, &JsonValue)>> {
    let obj = match value {
        JsonValue::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => obj,
        _ => return Ok(None),
    };

    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((op, operand)), None) => Ok(Some((op.as_str(), operand))),
        _ => Err(StoreError::invalid_argument(
            "modifier documents must contain exactly one operator",
        )),
    }
}
