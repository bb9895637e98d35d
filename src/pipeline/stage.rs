//! Pipeline stage AST

use crate::document::{FieldPath, Value, ID_FIELD};
use crate::errors::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::query::SortSpec;

/// How a `$group` stage partitions its input
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Every document lands in the same partition (`_id: null` or any literal)
    Constant(Value),
    /// Partition by the value at a path; a missing value groups as null
    Field(FieldPath),
    /// Partition by a document of several field values
    Compound(Vec<(String, FieldPath)>),
}

/// Reduction applied within a partition
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Value from the first document of the partition (null when absent)
    First(FieldPath),
    /// Mean over documents where the field is present and numeric
    Avg(FieldPath),
}

impl Accumulator {
    pub fn op_name(&self) -> &'static str {
        match self {
            Accumulator::First(_) => "$first",
            Accumulator::Avg(_) => "$avg",
        }
    }
}

/// `$group` definition: key plus named accumulators in output order
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStage {
    key: GroupKey,
    accumulators: Vec<(String, Accumulator)>,
}

impl GroupStage {
    /// Validate output field names: non-empty, no dots, no `$` prefix, not
    /// `_id`, unique.
    pub fn new(key: GroupKey, accumulators: Vec<(String, Accumulator)>) -> StoreResult<Self> {
        for (i, (name, _)) in accumulators.iter().enumerate() {
            validate_output_name(name)?;
            if accumulators[..i].iter().any(|(other, _)| other == name) {
                return Err(StoreError::invalid_argument(format!(
                    "duplicate $group output field '{}'",
                    name
                )));
            }
        }
        Ok(Self { key, accumulators })
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn accumulators(&self) -> &[(String, Accumulator)] {
        &self.accumulators
    }
}

fn validate_output_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.contains('.') || name.starts_with('$') {
        return Err(StoreError::invalid_argument(format!(
            "invalid $group output field name '{}'",
            name
        )));
    }
    if name == ID_FIELD {
        return Err(StoreError::invalid_argument("$group output may not redefine '_id'"));
    }
    Ok(())
}

/// One transformation step
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// One output row per array element
    Unwind(FieldPath),
    /// Keep rows satisfying the filter
    Match(Filter),
    /// Partition and accumulate
    Group(GroupStage),
    /// Stable sort
    Sort(SortSpec),
    /// Keep the first n rows
    Limit(usize),
}

impl Stage {
    pub fn unwind(path: &str) -> StoreResult<Self> {
        Ok(Stage::Unwind(FieldPath::parse(path)?))
    }

    /// Limit stage; negative counts are invalid
    pub fn limit(n: i64) -> StoreResult<Self> {
        usize::try_from(n)
            .map(Stage::Limit)
            .map_err(|_| StoreError::invalid_argument(format!("$limit must be non-negative, got {}", n)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Unwind(_) => "$unwind",
            Stage::Match(_) => "$match",
            Stage::Group(_) => "$group",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
        }
    }
}

/// Ordered stage list. Order is authoritative; nothing is reordered or fused.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn test_negative_limit_is_invalid() {
        let err = Stage::limit(-1).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert_eq!(Stage::limit(0).unwrap(), Stage::Limit(0));
        assert_eq!(Stage::limit(3).unwrap(), Stage::Limit(3));
    }

    #[test]
    fn test_group_output_names() {
        let first = Accumulator::First(path("name"));
        assert!(GroupStage::new(GroupKey::Constant(Value::Null), vec![("name".into(), first.clone())]).is_ok());
        assert!(GroupStage::new(GroupKey::Constant(Value::Null), vec![("_id".into(), first.clone())]).is_err());
        assert!(GroupStage::new(GroupKey::Constant(Value::Null), vec![("a.b".into(), first.clone())]).is_err());
        assert!(GroupStage::new(
            GroupKey::Constant(Value::Null),
            vec![("a".into(), first.clone()), ("a".into(), first)]
        )
        .is_err());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::unwind("scores").unwrap().name(), "$unwind");
        assert_eq!(Stage::Limit(1).name(), "$limit");
        assert!(Pipeline::default().is_empty());
    }
}
