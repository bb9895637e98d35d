//! Pipeline execution
//!
//! A straight-line interpreter: each stage consumes the previous stage's
//! output in full and produces a new stream. Runs over a snapshot and never
//! observes later writes.

use std::collections::HashMap;
use std::fmt::Write;

use crate::document::{Document, FieldPath, Value, ID_FIELD};
use crate::errors::StoreResult;
use crate::query::ResultSorter;

use super::stage::{Accumulator, GroupKey, GroupStage, Pipeline, Stage};

/// Executes pipelines
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run every stage in order over the input rows
    pub fn run(input: Vec<Document>, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let mut rows = input;
        for stage in pipeline.stages() {
            rows = Self::execute_stage(rows, stage)?;
        }
        Ok(rows)
    }

    fn execute_stage(mut rows: Vec<Document>, stage: &Stage) -> StoreResult<Vec<Document>> {
        match stage {
            Stage::Unwind(path) => Self::unwind(rows, path),
            Stage::Match(filter) => {
                rows.retain(|row| filter.matches(row));
                Ok(rows)
            }
            Stage::Group(group) => Ok(Self::group(rows, group)),
            Stage::Sort(spec) => {
                ResultSorter::sort(&mut rows, spec);
                Ok(rows)
            }
            Stage::Limit(n) => {
                rows.truncate(*n);
                Ok(rows)
            }
        }
    }

    /// Missing, null and empty arrays produce no rows; a non-array value
    /// passes through as a single row.
    fn unwind(rows: Vec<Document>, path: &FieldPath) -> StoreResult<Vec<Document>> {
        let mut output = Vec::with_capacity(rows.len());
        for row in rows {
            let items = match row.lookup(path) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(items)) => items.clone(),
                Some(_) => {
                    output.push(row);
                    continue;
                }
            };
            for item in items {
                let mut unwound = row.clone();
                unwound.set_path(path, item)?;
                output.push(unwound);
            }
        }
        Ok(output)
    }

    fn group(rows: Vec<Document>, group: &GroupStage) -> Vec<Document> {
        // first-seen order; the map only locates a partition by its key
        let mut partitions: Vec<Partition> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();

        for row in &rows {
            let key = group_key(row, group.key());
            let index = *index_by_key
                .entry(canonical_key(&key))
                .or_insert_with(|| {
                    partitions.push(Partition::new(key, group.accumulators()));
                    partitions.len() - 1
                });
            partitions[index].accumulate(row, group.accumulators());
        }

        partitions
            .into_iter()
            .map(|p| p.finish(group.accumulators()))
            .collect()
    }
}

fn group_key(row: &Document, key: &GroupKey) -> Value {
    match key {
        GroupKey::Constant(value) => value.clone(),
        GroupKey::Field(path) => row.lookup(path).cloned().unwrap_or(Value::Null),
        GroupKey::Compound(fields) => Value::Document(
            fields
                .iter()
                .map(|(name, path)| (name.clone(), row.lookup(path).cloned().unwrap_or(Value::Null)))
                .collect(),
        ),
    }
}

/// Encoding under which two keys are equal exactly when `compare_values`
/// reports them equal. Numbers encode by value and every NaN is one key.
fn canonical_key(key: &Value) -> String {
    let mut out = String::new();
    encode_key(key, &mut out);
    out
}

fn encode_key(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push('z'),
        Value::Bool(b) => out.push_str(if *b { "t" } else { "f" }),
        Value::Number(n) if n.is_nan() => out.push_str("nNaN;"),
        Value::Number(n) if *n == 0.0 => out.push_str("n0;"),
        Value::Number(n) => {
            let _ = write!(out, "n{:?};", n);
        }
        Value::String(s) => encode_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for item in items {
                encode_key(item, out);
            }
            out.push(']');
        }
        Value::Document(doc) => {
            out.push('{');
            for (name, field) in doc.iter() {
                encode_string(name, out);
                encode_key(field, out);
            }
            out.push('}');
        }
    }
}

fn encode_string(s: &str, out: &mut String) {
    let _ = write!(out, "s{}:{}", s.len(), s);
}

/// Running accumulator state
enum State {
    First(Option<Value>),
    Avg { sum: f64, count: u64 },
}

struct Partition {
    key: Value,
    states: Vec<State>,
    seen: bool,
}

impl Partition {
    fn new(key: Value, accumulators: &[(String, Accumulator)]) -> Self {
        let states = accumulators
            .iter()
            .map(|(_, acc)| match acc {
                Accumulator::First(_) => State::First(None),
                Accumulator::Avg(_) => State::Avg { sum: 0.0, count: 0 },
            })
            .collect();
        Self {
            key,
            states,
            seen: false,
        }
    }

    fn accumulate(&mut self, row: &Document, accumulators: &[(String, Accumulator)]) {
        let first_row = !self.seen;
        self.seen = true;

        for (state, (_, acc)) in self.states.iter_mut().zip(accumulators) {
            match (state, acc) {
                (State::First(slot), Accumulator::First(path)) => {
                    if first_row {
                        *slot = row.lookup(path).cloned();
                    }
                }
                (State::Avg { sum, count }, Accumulator::Avg(path)) => {
                    // absent or non-numeric values do not contribute
                    if let Some(n) = row.lookup(path).and_then(Value::as_f64) {
                        *sum += n;
                        *count += 1;
                    }
                }
                _ => {}
            }
        }
    }

    fn finish(self, accumulators: &[(String, Accumulator)]) -> Document {
        let mut output = Document::new();
        output.insert(ID_FIELD, self.key);

        for (state, (name, _)) in self.states.into_iter().zip(accumulators) {
            match state {
                State::First(value) => {
                    output.insert(name.clone(), value.unwrap_or(Value::Null));
                }
                State::Avg { sum, count } if count > 0 => {
                    output.insert(name.clone(), sum / count as f64);
                }
                // no contributing documents: no output field
                State::Avg { .. } => {}
            }
        }
        output
    }
}

/// Run a pipeline over a snapshot.
pub fn run(snapshot: Vec<Document>, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
    PipelineExecutor::run(snapshot, pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::query::SortSpec;
    use serde_json::json;

    fn docs(json: serde_json::Value) -> Vec<Document> {
        json.as_array()
            .unwrap()
            .iter()
            .map(|d| Document::from_json(d.clone()).unwrap())
            .collect()
    }

    fn to_json(rows: &[Document]) -> serde_json::Value {
        serde_json::Value::Array(rows.iter().map(Document::to_json).collect())
    }

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn test_unwind_emits_one_row_per_element() {
        let input = docs(json!([{"_id": "1", "tags": ["a", "b"]}]));
        let output = run(input, &Pipeline::new(vec![Stage::unwind("tags").unwrap()])).unwrap();
        assert_eq!(
            to_json(&output),
            json!([{"_id": "1", "tags": "a"}, {"_id": "1", "tags": "b"}])
        );
    }

    #[test]
    fn test_unwind_drops_missing_null_and_empty() {
        let input = docs(json!([
            {"_id": "1"},
            {"_id": "2", "tags": null},
            {"_id": "3", "tags": []},
            {"_id": "4", "tags": ["x"]}
        ]));
        let output = run(input, &Pipeline::new(vec![Stage::unwind("tags").unwrap()])).unwrap();
        assert_eq!(to_json(&output), json!([{"_id": "4", "tags": "x"}]));
    }

    #[test]
    fn test_unwind_scalar_passes_through() {
        let input = docs(json!([{"_id": "1", "tags": "solo"}]));
        let output = run(input, &Pipeline::new(vec![Stage::unwind("tags").unwrap()])).unwrap();
        assert_eq!(to_json(&output), json!([{"_id": "1", "tags": "solo"}]));
    }

    #[test]
    fn test_group_first_seen_order() {
        let input = docs(json!([
            {"_id": "1", "k": "b", "v": 1},
            {"_id": "2", "k": "a", "v": 2},
            {"_id": "3", "k": "b", "v": 3}
        ]));
        let group = GroupStage::new(
            GroupKey::Field(path("k")),
            vec![
                ("first_v".into(), Accumulator::First(path("v"))),
                ("avg_v".into(), Accumulator::Avg(path("v"))),
            ],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert_eq!(
            to_json(&output),
            json!([
                {"_id": "b", "first_v": 1, "avg_v": 2},
                {"_id": "a", "first_v": 2, "avg_v": 2}
            ])
        );
    }

    #[test]
    fn test_avg_ignores_absent_and_non_numeric() {
        let input = docs(json!([
            {"_id": "1", "score": 10},
            {"_id": "2"},
            {"_id": "3", "score": "n/a"},
            {"_id": "4", "score": 20}
        ]));
        let group = GroupStage::new(
            GroupKey::Constant(Value::Null),
            vec![("avg".into(), Accumulator::Avg(path("score")))],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert_eq!(to_json(&output), json!([{"_id": null, "avg": 15}]));
    }

    #[test]
    fn test_avg_without_contributors_has_no_field() {
        let input = docs(json!([{"_id": "1"}, {"_id": "2", "score": "x"}]));
        let group = GroupStage::new(
            GroupKey::Constant(Value::Null),
            vec![("avg".into(), Accumulator::Avg(path("score")))],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert_eq!(to_json(&output), json!([{"_id": null}]));
    }

    #[test]
    fn test_first_of_missing_is_null() {
        let input = docs(json!([{"_id": "1"}, {"_id": "2", "name": "late"}]));
        let group = GroupStage::new(
            GroupKey::Constant(Value::Null),
            vec![("name".into(), Accumulator::First(path("name")))],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert_eq!(to_json(&output), json!([{"_id": null, "name": null}]));
    }

    #[test]
    fn test_group_on_empty_input_emits_nothing() {
        let group = GroupStage::new(GroupKey::Constant(Value::Null), vec![]).unwrap();
        let output = run(Vec::new(), &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_compound_group_key() {
        let input = docs(json!([
            {"_id": "1", "a": 1, "b": "x"},
            {"_id": "2", "a": 1, "b": "x"},
            {"_id": "3", "a": 2, "b": "x"}
        ]));
        let group = GroupStage::new(
            GroupKey::Compound(vec![("a".into(), path("a")), ("b".into(), path("b"))]),
            vec![],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();
        assert_eq!(
            to_json(&output),
            json!([{"_id": {"a": 1, "b": "x"}}, {"_id": {"a": 2, "b": "x"}}])
        );
    }

    #[test]
    fn test_group_keys_equal_by_value() {
        let input = vec![
            Document::new().with("k", 1.0).with("v", 1.0),
            Document::new().with("k", Value::from_json(json!(1))).with("v", 3.0),
            Document::new().with("k", "1").with("v", 5.0),
            Document::new().with("k", f64::NAN).with("v", 7.0),
            Document::new().with("k", f64::NAN).with("v", 9.0),
            Document::new().with("k", -0.0).with("v", 2.0),
            Document::new().with("k", 0.0).with("v", 4.0),
        ];
        let group = GroupStage::new(
            GroupKey::Field(path("k")),
            vec![("avg_v".into(), Accumulator::Avg(path("v")))],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();

        let averages: Vec<f64> = output
            .iter()
            .map(|d| d.get("avg_v").and_then(Value::as_f64).unwrap())
            .collect();
        assert_eq!(averages, vec![2.0, 5.0, 8.0, 3.0]);
    }

    #[test]
    fn test_group_by_unique_key_keeps_every_row() {
        let input: Vec<Document> = (0..20_000)
            .map(|i| Document::new().with(ID_FIELD, format!("d{}", i)).with("s", i as f64))
            .collect();
        let group = GroupStage::new(
            GroupKey::Field(path(ID_FIELD)),
            vec![("a".into(), Accumulator::Avg(path("s")))],
        )
        .unwrap();
        let output = run(input, &Pipeline::new(vec![Stage::Group(group)])).unwrap();

        assert_eq!(output.len(), 20_000);
        assert_eq!(output[0].to_json(), json!({"_id": "d0", "a": 0}));
        assert_eq!(output[19_999].to_json(), json!({"_id": "d19999", "a": 19999}));
    }

    #[test]
    fn test_stage_order_is_literal() {
        let input = docs(json!([
            {"_id": "1", "scores": [{"type": "homework", "score": 70}, {"type": "exam", "score": 90}]}
        ]));
        let match_homework = Stage::Match(Filter::eq("scores.type", "homework").unwrap());

        // $match before $unwind cannot see through the array of documents
        let before = run(
            input.clone(),
            &Pipeline::new(vec![match_homework.clone(), Stage::unwind("scores").unwrap()]),
        )
        .unwrap();
        assert!(before.is_empty());

        let after = run(
            input,
            &Pipeline::new(vec![Stage::unwind("scores").unwrap(), match_homework]),
        )
        .unwrap();
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_sort_then_limit() {
        let input = docs(json!([
            {"_id": "1", "n": 3}, {"_id": "2", "n": 1}, {"_id": "3", "n": 2}
        ]));
        let output = run(
            input,
            &Pipeline::new(vec![Stage::Sort(SortSpec::asc("n").unwrap()), Stage::Limit(2)]),
        )
        .unwrap();
        assert_eq!(to_json(&output), json!([{"_id": "2", "n": 1}, {"_id": "3", "n": 2}]));
    }
}
