//! Result sorting
//!
//! Stable, deterministic multi-key sort. Documents missing a sort field
//! order as least regardless of direction.

use std::cmp::Ordering;

use crate::document::{compare_optional, Document};

use super::options::{SortDirection, SortSpec};

/// Sorts documents
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts documents according to the sort specification.
    ///
    /// Sort is stable: documents that compare equal keep their input order.
    pub fn sort(documents: &mut [Document], sort_spec: &SortSpec) {
        documents.sort_by(|a, b| Self::compare(a, b, sort_spec));
    }

    /// Compares two documents key by key
    pub fn compare(a: &Document, b: &Document, sort_spec: &SortSpec) -> Ordering {
        for key in sort_spec.keys() {
            let ordering = compare_optional(
                a.lookup(&key.field),
                b.lookup(&key.field),
                key.direction == SortDirection::Desc,
            );
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
