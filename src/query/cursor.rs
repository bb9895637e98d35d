//! Query result cursor

use crate::document::Document;

use super::options::Projection;

/// A finite, single-pass sequence of result documents.
///
/// The result set is captured when the query runs; projection is applied
/// lazily as documents are pulled. A cursor cannot be restarted.
#[derive(Debug)]
pub struct Cursor {
    documents: std::vec::IntoIter<Document>,
    projection: Option<Projection>,
}

impl Cursor {
    pub(crate) fn new(documents: Vec<Document>, projection: Option<Projection>) -> Self {
        Self {
            documents: documents.into_iter(),
            projection,
        }
    }

    /// Documents not yet consumed
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }

    /// Drain the cursor into a vector
    pub fn into_vec(self) -> Vec<Document> {
        self.collect()
    }
}

impl Iterator for Cursor {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        let document = self.documents.next()?;
        Some(match &self.projection {
            Some(projection) => projection.apply(&document),
            None => document,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
