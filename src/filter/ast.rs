//! Filter AST
//!
//! A closed tree of combinators and field-bound leaves, built once per call.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::document::{Document, FieldPath, Value};
use crate::errors::{StoreError, StoreResult};

/// A compiled `$regex` operand
#[derive(Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern. Case-insensitivity is an explicit flag, never
    /// inferred from the pattern text.
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> StoreResult<Self> {
        Self::with_options(source, case_insensitive, false, false)
    }

    /// Compile with the full option set (`i`, `m`, `s`)
    pub fn with_options(
        source: impl Into<String>,
        case_insensitive: bool,
        multi_line: bool,
        dot_matches_new_line: bool,
    ) -> StoreResult<Self> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .multi_line(multi_line)
            .dot_matches_new_line(dot_matches_new_line)
            .build()
            .map_err(|e| StoreError::invalid_argument(format!("invalid $regex '{}': {}", source, e)))?;

        Ok(Self {
            source,
            case_insensitive,
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)?;
        if self.case_insensitive {
            write!(f, "i")?;
        }
        Ok(())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str() && self.case_insensitive == other.case_insensitive
    }
}

/// Leaf condition types
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// field = value
    Eq(Value),
    /// field != value
    Ne(Value),
    /// field > value
    Gt(Value),
    /// field >= value
    Gte(Value),
    /// field < value
    Lt(Value),
    /// field <= value
    Lte(Value),
    /// field equals one of the values
    In(Vec<Value>),
    /// field equals none of the values
    Nin(Vec<Value>),
    /// field is present (true) or absent (false)
    Exists(bool),
    /// field is a string matching the pattern
    Regex(Pattern),
}

impl Condition {
    /// Returns the operator name for diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::Gt(_) => "$gt",
            Condition::Gte(_) => "$gte",
            Condition::Lt(_) => "$lt",
            Condition::Lte(_) => "$lte",
            Condition::In(_) => "$in",
            Condition::Nin(_) => "$nin",
            Condition::Exists(_) => "$exists",
            Condition::Regex(_) => "$regex",
        }
    }
}

/// A single leaf (field + condition)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field path
    pub field: FieldPath,
    /// Condition applied to the resolved value
    pub op: Condition,
}

impl Predicate {
    pub fn new(field: &str, op: Condition) -> StoreResult<Self> {
        Ok(Self {
            field: FieldPath::parse(field)?,
            op,
        })
    }
}

/// Filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A field-bound leaf
    Field(Predicate),
    /// Satisfied when every child is; empty is always satisfied
    And(Vec<Filter>),
    /// Satisfied when any child is; empty is never satisfied
    Or(Vec<Filter>),
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// Leaf on a dotted field path
    pub fn field(path: &str, op: Condition) -> StoreResult<Self> {
        Ok(Filter::Field(Predicate::new(path, op)?))
    }

    /// Equality leaf
    pub fn eq(path: &str, value: impl Into<Value>) -> StoreResult<Self> {
        Self::field(path, Condition::Eq(value.into()))
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// Check if a document satisfies this filter.
    pub fn matches(&self, document: &Document) -> bool {
        super::evaluator::PredicateFilter::matches(document, self)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}
