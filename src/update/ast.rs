//! Update specification AST

use crate::document::{FieldPath, Value};
use crate::errors::{StoreError, StoreResult};

/// Which array elements `$pull` removes
#[derive(Debug, Clone, PartialEq)]
pub enum PullCondition {
    /// Elements equal to the value
    Equals(Value),
    /// Elements equal to any of the values
    In(Vec<Value>),
}

impl PullCondition {
    pub fn matches(&self, element: &Value) -> bool {
        match self {
            PullCondition::Equals(value) => element == value,
            PullCondition::In(values) => values.contains(element),
        }
    }
}

/// One operator directive bound to one field
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Assign a value, creating intermediate documents
    Set { path: FieldPath, value: Value },
    /// Remove the field
    Unset { path: FieldPath },
    /// Append each value not already present
    AddToSet { path: FieldPath, values: Vec<Value> },
    /// Remove every matching element
    Pull {
        path: FieldPath,
        condition: PullCondition,
    },
}

impl Directive {
    pub fn set(path: &str, value: impl Into<Value>) -> StoreResult<Self> {
        Ok(Directive::Set {
            path: FieldPath::parse(path)?,
            value: value.into(),
        })
    }

    pub fn unset(path: &str) -> StoreResult<Self> {
        Ok(Directive::Unset {
            path: FieldPath::parse(path)?,
        })
    }

    pub fn add_to_set(path: &str, values: Vec<Value>) -> StoreResult<Self> {
        Ok(Directive::AddToSet {
            path: FieldPath::parse(path)?,
            values,
        })
    }

    pub fn pull(path: &str, condition: PullCondition) -> StoreResult<Self> {
        Ok(Directive::Pull {
            path: FieldPath::parse(path)?,
            condition,
        })
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            Directive::Set { path, .. }
            | Directive::Unset { path }
            | Directive::AddToSet { path, .. }
            | Directive::Pull { path, .. } => path,
        }
    }

    /// Returns the operator name for diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            Directive::Set { .. } => "$set",
            Directive::Unset { .. } => "$unset",
            Directive::AddToSet { .. } => "$addToSet",
            Directive::Pull { .. } => "$pull",
        }
    }
}

/// An ordered set of directives over independent fields
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    directives: Vec<Directive>,
}

impl UpdateSpec {
    /// Validate and build a specification.
    ///
    /// Rejects an empty directive list, directives on `_id`, and two
    /// directives whose paths overlap.
    pub fn new(directives: Vec<Directive>) -> StoreResult<Self> {
        if directives.is_empty() {
            return Err(StoreError::invalid_argument("update must contain at least one directive"));
        }

        for (i, directive) in directives.iter().enumerate() {
            let path = directive.path();
            if path.segments()[0] == crate::document::ID_FIELD {
                return Err(StoreError::invalid_argument(format!(
                    "{} cannot modify the immutable field '_id'",
                    directive.op_name()
                )));
            }
            if let Some(other) = directives[..i].iter().find(|d| d.path().overlaps(path)) {
                return Err(StoreError::invalid_argument(format!(
                    "conflicting update paths '{}' and '{}'",
                    other.path(),
                    path
                )));
            }
        }

        Ok(Self { directives })
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert!(UpdateSpec::new(vec![]).is_err());
    }

    #[test]
    fn test_rejects_id() {
        let err = UpdateSpec::new(vec![Directive::set("_id", "x").unwrap()]).unwrap_err();
        assert!(err.to_string().contains("_id"));
        assert!(UpdateSpec::new(vec![Directive::unset("_id.x").unwrap()]).is_err());
    }

    #[test]
    fn test_rejects_overlapping_paths() {
        let spec = UpdateSpec::new(vec![
            Directive::set("address", "x").unwrap(),
            Directive::unset("address.state").unwrap(),
        ]);
        assert!(spec.is_err());

        let spec = UpdateSpec::new(vec![
            Directive::set("a", 1).unwrap(),
            Directive::set("b", 2).unwrap(),
        ]);
        assert!(spec.is_ok());
    }

    #[test]
    fn test_pull_condition() {
        let cond = PullCondition::In(vec![Value::from("tag2"), Value::from("tag1-a")]);
        assert!(cond.matches(&Value::from("tag2")));
        assert!(!cond.matches(&Value::from("tag2-a")));
        assert!(PullCondition::Equals(Value::from(1)).matches(&Value::from(1.0)));
    }
}
