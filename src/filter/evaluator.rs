//! Predicate evaluation
//!
//! Matches documents against a filter tree. Evaluation is pure and total:
//! a malformed filter cannot reach here because the AST is validated when
//! built.
//!
//! Array-implicit-any: when a leaf resolves to an array, the leaf holds if it
//! holds for the array itself or for at least one element. `$ne` and `$nin`
//! are the negations of `$eq` and `$in` under that rule.

use std::cmp::Ordering;

use crate::document::{compare_comparable, Document, Value};

use super::ast::{Condition, Filter, Predicate};

/// Evaluates filters against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document satisfies a filter tree
    pub fn matches(document: &Document, filter: &Filter) -> bool {
        match filter {
            Filter::Field(predicate) => Self::matches_predicate(document, predicate),
            // `all`/`any` short-circuit on the first decisive child
            Filter::And(children) => children.iter().all(|c| Self::matches(document, c)),
            Filter::Or(children) => children.iter().any(|c| Self::matches(document, c)),
        }
    }

    /// Checks if a document satisfies a single leaf
    fn matches_predicate(document: &Document, predicate: &Predicate) -> bool {
        let value = match document.lookup(&predicate.field) {
            Some(v) => v,
            // Unresolvable path: only `$exists: false` holds
            None => return matches!(predicate.op, Condition::Exists(false)),
        };

        match &predicate.op {
            Condition::Exists(expected) => *expected,
            Condition::Eq(expected) => Self::eq_match(value, expected),
            Condition::Ne(expected) => !Self::eq_match(value, expected),
            Condition::In(candidates) => candidates.iter().any(|c| Self::eq_match(value, c)),
            Condition::Nin(candidates) => !candidates.iter().any(|c| Self::eq_match(value, c)),
            Condition::Gt(bound) => Self::range_match(value, bound, |o| o == Ordering::Greater),
            Condition::Gte(bound) => Self::range_match(value, bound, |o| o != Ordering::Less),
            Condition::Lt(bound) => Self::range_match(value, bound, |o| o == Ordering::Less),
            Condition::Lte(bound) => Self::range_match(value, bound, |o| o != Ordering::Greater),
            Condition::Regex(pattern) => Self::any_element(value, |v| {
                v.as_str().map(|s| pattern.is_match(s)).unwrap_or(false)
            }),
        }
    }

    /// Holds for the value itself or, for arrays, any element
    fn any_element(value: &Value, check: impl Fn(&Value) -> bool) -> bool {
        if check(value) {
            return true;
        }
        match value {
            Value::Array(items) => items.iter().any(check),
            _ => false,
        }
    }

    /// Exact equality match (no coercion)
    fn eq_match(actual: &Value, expected: &Value) -> bool {
        Self::any_element(actual, |v| v == expected)
    }

    /// Ordered comparison between values of the same class
    fn range_match(actual: &Value, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
        Self::any_element(actual, |v| {
            compare_comparable(v, bound).map(&accept).unwrap_or(false)
        })
    }
}

/// Check if a document satisfies a filter.
pub fn matches(document: &Document, filter: &Filter) -> bool {
    PredicateFilter::matches(document, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ast::Pattern;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        Document::from_json(json).unwrap()
    }

    fn leaf(path: &str, op: Condition) -> Filter {
        Filter::field(path, op).unwrap()
    }

    #[test]
    fn test_equality_match() {
        let d = doc(json!({"name": "Alice", "age": 30}));
        assert!(matches(&d, &Filter::eq("name", "Alice").unwrap()));
        assert!(!matches(&d, &Filter::eq("name", "Bob").unwrap()));
    }

    #[test]
    fn test_no_type_coercion() {
        let d = doc(json!({"value": 123}));
        assert!(!matches(&d, &Filter::eq("value", "123").unwrap()));
        assert!(matches(&d, &Filter::eq("value", 123).unwrap()));
    }

    #[test]
    fn test_range_predicates() {
        let d = doc(json!({"age": 25}));
        assert!(matches(&d, &leaf("age", Condition::Gte(Value::from(25)))));
        assert!(matches(&d, &leaf("age", Condition::Lte(Value::from(30)))));
        assert!(!matches(&d, &leaf("age", Condition::Gt(Value::from(25)))));
        assert!(!matches(&d, &leaf("age", Condition::Lt(Value::from(25)))));
        // cross-class comparisons never hold
        assert!(!matches(&d, &leaf("age", Condition::Lt(Value::from("z")))));
    }

    #[test]
    fn test_nan_never_compares() {
        let d = doc(json!({"age": 1}));
        assert!(!matches(&d, &leaf("age", Condition::Gte(Value::Number(f64::NAN)))));
        assert!(!matches(&d, &leaf("age", Condition::Lt(Value::Number(f64::NAN)))));
    }

    #[test]
    fn test_missing_field_only_satisfies_exists_false() {
        let d = doc(json!({"name": "Alice"}));
        assert!(!matches(&d, &Filter::eq("age", 30).unwrap()));
        assert!(!matches(&d, &leaf("age", Condition::Ne(Value::from(30)))));
        assert!(!matches(&d, &leaf("age", Condition::Nin(vec![Value::from(1)]))));
        assert!(!matches(&d, &leaf("age", Condition::Exists(true))));
        assert!(matches(&d, &leaf("age", Condition::Exists(false))));
    }

    #[test]
    fn test_null_is_present() {
        let d = doc(json!({"skills": null}));
        assert!(matches(&d, &leaf("skills", Condition::Exists(true))));
        assert!(matches(&d, &Filter::eq("skills", Value::Null).unwrap()));
        assert!(!matches(&d, &leaf("skills", Condition::Ne(Value::Null))));
    }

    #[test]
    fn test_array_implicit_any() {
        let d = doc(json!({"tags": ["Engineering", "Sales"], "scores": [40, 95]}));
        assert!(matches(&d, &Filter::eq("tags", "Sales").unwrap()));
        assert!(matches(&d, &leaf("scores", Condition::Gte(Value::from(90)))));
        assert!(matches(
            &d,
            &leaf("tags", Condition::In(vec![Value::from("x"), Value::from("Engineering")]))
        ));
        let pattern = Pattern::new("^eng", true).unwrap();
        assert!(matches(&d, &leaf("tags", Condition::Regex(pattern))));
    }

    #[test]
    fn test_whole_array_equality() {
        let d = doc(json!({"tags": ["a", "b"]}));
        let whole = Value::from_json(json!(["a", "b"]));
        assert!(matches(&d, &Filter::eq("tags", whole).unwrap()));
    }

    #[test]
    fn test_ne_on_array_negates_any() {
        let d = doc(json!({"tags": ["a", "b"]}));
        assert!(!matches(&d, &leaf("tags", Condition::Ne(Value::from("a")))));
        assert!(matches(&d, &leaf("tags", Condition::Ne(Value::from("c")))));
    }

    #[test]
    fn test_regex_ignores_non_strings() {
        let d = doc(json!({"email": 42}));
        let pattern = Pattern::new("4", false).unwrap();
        assert!(!matches(&d, &leaf("email", Condition::Regex(pattern))));
    }

    #[test]
    fn test_empty_combinators() {
        let d = doc(json!({"a": 1}));
        assert!(matches(&d, &Filter::and(vec![])));
        assert!(!matches(&d, &Filter::or(vec![])));
    }

    #[test]
    fn test_dotted_path_through_scalar_is_no_match() {
        let d = doc(json!({"address": "somewhere"}));
        assert!(!matches(&d, &Filter::eq("address.state", "CA").unwrap()));
        assert!(matches(&d, &leaf("address.state", Condition::Exists(false))));
    }
}
