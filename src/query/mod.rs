//! Query support shared by collection reads and pipelines
//!
//! - `FindOptions`: projection, sort and limit for `find`
//! - `ResultSorter`: stable multi-key sort, missing values least
//! - `Cursor`: single-pass result sequence

mod cursor;
mod options;
mod sorter;

pub use cursor::Cursor;
pub use options::{FindOptions, Projection, ReturnMode, SortDirection, SortKey, SortSpec};
pub use sorter::ResultSorter;
