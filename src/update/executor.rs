//! Update execution
//!
//! Applies an update specification to a document and returns the new
//! document. The input is never mutated and fields not named in the
//! specification are never touched.

use crate::document::{Document, FieldPath, Value};
use crate::errors::{StoreError, StoreResult};

use super::ast::{Directive, PullCondition, UpdateSpec};

/// Applies update specifications
pub struct UpdateExecutor;

impl UpdateExecutor {
    /// Compute the updated document.
    ///
    /// Fails with a field path error when a dotted path crosses a
    /// non-document value, and with a type mismatch when `$addToSet` or
    /// `$pull` targets an existing non-array.
    pub fn apply(document: &Document, spec: &UpdateSpec) -> StoreResult<Document> {
        let mut updated = document.clone();
        for directive in spec.directives() {
            Self::apply_directive(&mut updated, directive)?;
        }
        Ok(updated)
    }

    fn apply_directive(document: &mut Document, directive: &Directive) -> StoreResult<()> {
        match directive {
            Directive::Set { path, value } => {
                document.set_path(path, value.clone())?;
            }
            Directive::Unset { path } => {
                document.remove_path(path)?;
            }
            Directive::AddToSet { path, values } => Self::add_to_set(document, path, values)?,
            Directive::Pull { path, condition } => Self::pull(document, path, condition)?,
        }
        Ok(())
    }

    fn add_to_set(document: &mut Document, path: &FieldPath, values: &[Value]) -> StoreResult<()> {
        match document.lookup_mut(path)? {
            Some(Value::Array(items)) => {
                append_missing(items, values);
                Ok(())
            }
            Some(other) => Err(StoreError::type_mismatch(path.as_str(), "array", other.type_name())),
            None => {
                let mut items = Vec::with_capacity(values.len());
                append_missing(&mut items, values);
                document.set_path(path, Value::Array(items))?;
                Ok(())
            }
        }
    }

    fn pull(document: &mut Document, path: &FieldPath, condition: &PullCondition) -> StoreResult<()> {
        match document.lookup_mut(path)? {
            Some(Value::Array(items)) => {
                items.retain(|item| !condition.matches(item));
                Ok(())
            }
            Some(other) => Err(StoreError::type_mismatch(path.as_str(), "array", other.type_name())),
            // nothing to pull from
            None => Ok(()),
        }
    }
}

/// Push each value not already present, keeping array order
fn append_missing(items: &mut Vec<Value>, values: &[Value]) {
    for value in values {
        if !items.contains(value) {
            items.push(value.clone());
        }
    }
}

/// Apply an update specification to a document.
pub fn apply(document: &Document, spec: &UpdateSpec) -> StoreResult<Document> {
    UpdateExecutor::apply(document, spec)
}
