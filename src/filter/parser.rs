//! Filter parsing
//!
//! Turns the JSON filter dialect into a `Filter` tree:
//!
//! ```text
//! {"$or": [{"age": {"$gte": 25, "$lt": 30}}, {"tags": "Engineering"}]}
//! {"email": {"$regex": "^john", "$options": "i"}, "address.state": "CA"}
//! ```
//!
//! A document with several keys is an implicit `$and`; a bare value on a
//! field means equality; `{}` matches everything.

use serde_json::{Map, Value as JsonValue};

use crate::document::{json_type, Value};
use crate::errors::{StoreError, StoreResult};

use super::ast::{Condition, Filter, Pattern, Predicate};

impl Filter {
    /// Parse a filter document
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        match json {
            JsonValue::Object(obj) => parse_clauses(obj),
            JsonValue::Null => Ok(Filter::all()),
            other => Err(StoreError::invalid_argument(format!(
                "filter must be a document, found {}",
                json_type(other)
            ))),
        }
    }
}

fn parse_clauses(obj: &Map<String, JsonValue>) -> StoreResult<Filter> {
    let mut clauses = Vec::with_capacity(obj.len());

    for (key, operand) in obj {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_children(key, operand)?)),
            "$or" => clauses.push(Filter::Or(parse_children(key, operand)?)),
            op if op.starts_with('$') => {
                return Err(StoreError::invalid_argument(format!(
                    "unknown top-level operator '{}'",
                    op
                )))
            }
            field => clauses.extend(parse_field(field, operand)?),
        }
    }

    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(Filter::And(clauses))
    }
}

fn parse_children(op: &str, operand: &JsonValue) -> StoreResult<Vec<Filter>> {
    let items = operand.as_array().ok_or_else(|| {
        StoreError::invalid_argument(format!("{} requires an array of filters", op))
    })?;

    items
        .iter()
        .map(|item| match item {
            JsonValue::Object(obj) => parse_clauses(obj),
            other => Err(StoreError::invalid_argument(format!(
                "{} entries must be documents, found {}",
                op,
                json_type(other)
            ))),
        })
        .collect()
}

/// Parse the operand bound to one field into one or more leaves
fn parse_field(field: &str, operand: &JsonValue) -> StoreResult<Vec<Filter>> {
    let ops = match operand {
        JsonValue::Object(obj) if is_operator_document(obj)? => obj,
        _ => {
            let pred = Predicate::new(field, Condition::Eq(Value::from_json(operand.clone())))?;
            return Ok(vec![Filter::Field(pred)]);
        }
    };

    let mut leaves = Vec::with_capacity(ops.len());
    for (op, value) in ops {
        let condition = match op.as_str() {
            "$eq" => Condition::Eq(Value::from_json(value.clone())),
            "$ne" => Condition::Ne(Value::from_json(value.clone())),
            "$gt" => Condition::Gt(Value::from_json(value.clone())),
            "$gte" => Condition::Gte(Value::from_json(value.clone())),
            "$lt" => Condition::Lt(Value::from_json(value.clone())),
            "$lte" => Condition::Lte(Value::from_json(value.clone())),
            "$in" => Condition::In(parse_value_list(op, value)?),
            "$nin" => Condition::Nin(parse_value_list(op, value)?),
            "$exists" => Condition::Exists(parse_truthy(op, value)?),
            "$regex" => Condition::Regex(parse_regex(value, ops.get("$options"))?),
            // consumed together with $regex
            "$options" if ops.contains_key("$regex") => continue,
            "$options" => {
                return Err(StoreError::invalid_argument("$options requires $regex"))
            }
            unknown => {
                return Err(StoreError::invalid_argument(format!(
                    "unknown operator '{}' on field '{}'",
                    unknown, field
                )))
            }
        };
        leaves.push(Filter::Field(Predicate::new(field, condition)?));
    }

    Ok(leaves)
}

/// `{"$gte": 1}` is an operator document, `{"a": 1}` a literal; mixing is an
/// error and `{}` is the literal empty document.
fn is_operator_document(obj: &Map<String, JsonValue>) -> StoreResult<bool> {
    let operators = obj.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return Ok(false);
    }
    if operators != obj.len() {
        return Err(StoreError::invalid_argument(
            "cannot mix operators and literal fields in one condition",
        ));
    }
    Ok(true)
}

fn parse_value_list(op: &str, value: &JsonValue) -> StoreResult<Vec<Value>> {
    match value {
        JsonValue::Array(items) => Ok(items.iter().cloned().map(Value::from_json).collect()),
        other => Err(StoreError::invalid_argument(format!(
            "{} requires an array, found {}",
            op,
            json_type(other)
        ))),
    }
}

fn parse_truthy(op: &str, value: &JsonValue) -> StoreResult<bool> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        other => Err(StoreError::invalid_argument(format!(
            "{} requires a boolean, found {}",
            op,
            json_type(other)
        ))),
    }
}

fn parse_regex(pattern: &JsonValue, options: Option<&JsonValue>) -> StoreResult<Pattern> {
    let source = pattern
        .as_str()
        .ok_or_else(|| StoreError::invalid_argument("$regex requires a string pattern"))?;

    let flags = match options {
        None => "",
        Some(JsonValue::String(flags)) => flags.as_str(),
        Some(_) => return Err(StoreError::invalid_argument("$options must be a string")),
    };

    let (mut case_insensitive, mut multi_line, mut dot_all) = (false, false, false);
    for flag in flags.chars() {
        match flag {
            'i' => case_insensitive = true,
            'm' => multi_line = true,
            's' => dot_all = true,
            other => {
                return Err(StoreError::invalid_argument(format!(
                    "unsupported $regex option '{}'",
                    other
                )))
            }
        }
    }

    Pattern::with_options(source, case_insensitive, multi_line, dot_all)
}
