//! Pipeline parsing
//!
//! ```text
//! [
//!   {"$unwind": "$scores"},
//!   {"$match": {"scores.type": "homework"}},
//!   {"$sort": {"scores.score": 1}},
//!   {"$group": {"_id": "$name", "worst": {"$first": "$scores.score"}}},
//!   {"$limit": 10}
//! ]
//! ```

use serde_json::{Map, Value as JsonValue};

use crate::document::{json_type, FieldPath, Value, ID_FIELD};
use crate::errors::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::query::SortSpec;

use super::stage::{Accumulator, GroupKey, GroupStage, Pipeline, Stage};

impl Pipeline {
    /// Parse an array of single-key stage documents
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let items = json.as_array().ok_or_else(|| {
            StoreError::invalid_argument(format!(
                "pipeline must be an array of stages, found {}",
                json_type(json)
            ))
        })?;

        let stages = items
            .iter()
            .map(Stage::parse)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Pipeline::new(stages))
    }
}

impl Stage {
    /// Parse one `{"$stage": operand}` document
    pub fn parse(json: &JsonValue) -> StoreResult<Self> {
        let obj = match json {
            JsonValue::Object(obj) if obj.len() == 1 => obj,
            _ => {
                return Err(StoreError::invalid_argument(
                    "each pipeline stage must be a document with exactly one key",
                ))
            }
        };

        let Some((name, operand)) = obj.iter().next() else {
            return Err(StoreError::invalid_argument("empty pipeline stage"));
        };

        match name.as_str() {
            "$unwind" => parse_unwind(operand),
            "$match" => Ok(Stage::Match(Filter::parse(operand)?)),
            "$group" => parse_group(operand),
            "$sort" => Ok(Stage::Sort(SortSpec::parse(operand)?)),
            "$limit" => parse_limit(operand),
            other => Err(StoreError::invalid_argument(format!(
                "unsupported pipeline stage '{}'",
                other
            ))),
        }
    }
}

/// `"$field"` or `{"path": "$field"}`
fn parse_unwind(operand: &JsonValue) -> StoreResult<Stage> {
    let reference = match operand {
        JsonValue::String(s) => s.as_str(),
        JsonValue::Object(obj) => obj
            .get("path")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| StoreError::invalid_argument("$unwind requires a 'path' string"))?,
        other => {
            return Err(StoreError::invalid_argument(format!(
                "$unwind expects a field reference, found {}",
                json_type(other)
            )))
        }
    };
    Ok(Stage::Unwind(FieldPath::parse_reference(reference)?))
}

fn parse_limit(operand: &JsonValue) -> StoreResult<Stage> {
    match operand.as_i64() {
        Some(n) => Stage::limit(n),
        None => match operand.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 0.0 => Ok(Stage::Limit(f as usize)),
            _ => Err(StoreError::invalid_argument(format!(
                "$limit must be a non-negative integer, found {}",
                operand
            ))),
        },
    }
}

fn parse_group(operand: &JsonValue) -> StoreResult<Stage> {
    let obj = operand.as_object().ok_or_else(|| {
        StoreError::invalid_argument(format!(
            "$group expects a document, found {}",
            json_type(operand)
        ))
    })?;

    let key_json = obj
        .get(ID_FIELD)
        .ok_or_else(|| StoreError::invalid_argument("$group requires an '_id' key"))?;
    let key = parse_group_key(key_json)?;

    let accumulators = obj
        .iter()
        .filter(|(name, _)| name.as_str() != ID_FIELD)
        .map(|(name, spec)| Ok((name.clone(), parse_accumulator(name, spec)?)))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Stage::Group(GroupStage::new(key, accumulators)?))
}

fn parse_group_key(json: &JsonValue) -> StoreResult<GroupKey> {
    match json {
        JsonValue::String(s) if s.starts_with('$') => {
            Ok(GroupKey::Field(FieldPath::parse_reference(s)?))
        }
        JsonValue::Object(obj) if !obj.is_empty() && obj.values().all(is_reference) => {
            let fields = obj
                .iter()
                .map(|(name, reference)| Ok((name.clone(), reference_path(reference)?)))
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(GroupKey::Compound(fields))
        }
        other => Ok(GroupKey::Constant(Value::from_json(other.clone()))),
    }
}

fn parse_accumulator(name: &str, spec: &JsonValue) -> StoreResult<Accumulator> {
    let obj = single_key(spec).ok_or_else(|| {
        StoreError::invalid_argument(format!(
            "$group field '{}' must be a single accumulator document",
            name
        ))
    })?;
    let Some((op, operand)) = obj.iter().next() else {
        return Err(StoreError::invalid_argument(format!(
            "$group field '{}' has no accumulator",
            name
        )));
    };

    let path = reference_path(operand).map_err(|_| {
        StoreError::invalid_argument(format!(
            "{} in '{}' expects a field reference like \"$field\"",
            op, name
        ))
    })?;

    match op.as_str() {
        "$first" => Ok(Accumulator::First(path)),
        "$avg" => Ok(Accumulator::Avg(path)),
        other => Err(StoreError::invalid_argument(format!(
            "unsupported accumulator '{}'",
            other
        ))),
    }
}

fn single_key(json: &JsonValue) -> Option<&Map<String, JsonValue>> {
    json.as_object().filter(|obj| obj.len() == 1)
}

fn is_reference(json: &JsonValue) -> bool {
    json.as_str().is_some_and(|s| s.starts_with('$'))
}

fn reference_path(json: &JsonValue) -> StoreResult<FieldPath> {
    match json.as_str() {
        Some(s) => FieldPath::parse_reference(s),
        None => Err(StoreError::invalid_argument(format!(
            "expected a field reference, found {}",
            json_type(json)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_pipeline() {
        let pipeline = Pipeline::parse(&json!([
            {"$unwind": "$scores"},
            {"$match": {"scores.type": "homework"}},
            {"$sort": {"scores.score": 1}},
            {"$group": {"_id": "$name", "worst": {"$first": "$scores.score"}}},
            {"$limit": 10}
        ]))
        .unwrap();

        let names: Vec<_> = pipeline.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["$unwind", "$match", "$sort", "$group", "$limit"]);
    }

    #[test]
    fn test_unwind_forms() {
        let short = Stage::parse(&json!({"$unwind": "$tags"})).unwrap();
        let long = Stage::parse(&json!({"$unwind": {"path": "$tags"}})).unwrap();
        assert_eq!(short, long);
        assert!(Stage::parse(&json!({"$unwind": "tags"})).is_err());
    }

    #[test]
    fn test_group_keys() {
        let Stage::Group(g) = Stage::parse(&json!({"$group": {"_id": null}})).unwrap() else {
            panic!("expected group");
        };
        assert_eq!(g.key(), &GroupKey::Constant(Value::Null));

        let Stage::Group(g) = Stage::parse(&json!({"$group": {"_id": "$dept"}})).unwrap() else {
            panic!("expected group");
        };
        assert_eq!(g.key(), &GroupKey::Field(FieldPath::parse("dept").unwrap()));

        let Stage::Group(g) =
            Stage::parse(&json!({"$group": {"_id": {"d": "$dept", "y": "$year"}}})).unwrap()
        else {
            panic!("expected group");
        };
        assert!(matches!(g.key(), GroupKey::Compound(fields) if fields.len() == 2));
    }

    #[test]
    fn test_group_requires_id() {
        let err = Stage::parse(&json!({"$group": {"avg": {"$avg": "$n"}}})).unwrap_err();
        assert!(err.to_string().contains("_id"));
    }

    #[test]
    fn test_unknown_accumulator_and_stage() {
        assert!(Stage::parse(&json!({"$group": {"_id": null, "s": {"$sum": "$n"}}})).is_err());
        assert!(Stage::parse(&json!({"$project": {"a": 1}})).is_err());
        assert!(Stage::parse(&json!({"$limit": 1, "$sort": {"a": 1}})).is_err());
    }

    #[test]
    fn test_limit_validation() {
        assert_eq!(Stage::parse(&json!({"$limit": 5})).unwrap(), Stage::Limit(5));
        assert_eq!(Stage::parse(&json!({"$limit": 0})).unwrap(), Stage::Limit(0));
        assert!(Stage::parse(&json!({"$limit": -1})).is_err());
        assert!(Stage::parse(&json!({"$limit": 1.5})).is_err());
        assert!(Stage::parse(&json!({"$limit": "3"})).is_err());
    }

    #[test]
    fn test_pipeline_must_be_array() {
        assert!(Pipeline::parse(&json!({"$limit": 1})).is_err());
        assert!(Pipeline::parse(&json!([])).unwrap().is_empty());
    }
}
