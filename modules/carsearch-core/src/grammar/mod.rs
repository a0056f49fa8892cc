//! Filter and sort expression grammar understood by the search index.
//!
//! Model output is parsed here before it is handed to the index, so a
//! malformed expression surfaces as a generation failure instead of a search
//! rejection. Parsed expressions render back canonically and re-parse to the
//! same tree.

mod filter;
mod sort;

pub use filter::{parse_filter, Comparator, Condition, FilterExpr, FilterValue, Operand};
pub use sort::{parse_sort, Direction, SortField, SortSpec, MAX_SORT_FIELDS};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("empty expression")]
    Empty,

    #[error("expected a field name at offset {0}")]
    ExpectedField(usize),

    #[error("expected ':' after field `{0}`")]
    ExpectedColon(String),

    #[error("missing value for field `{0}`")]
    EmptyValue(String),

    #[error("unterminated backtick value for field `{0}`")]
    UnterminatedBacktick(String),

    #[error("unterminated value list for field `{0}`")]
    UnterminatedList(String),

    #[error("unbalanced parenthesis at offset {0}")]
    UnbalancedParen(usize),

    #[error("unexpected input at offset {offset}: `{found}`")]
    Unexpected { offset: usize, found: String },

    #[error("invalid range `{value}` for field `{field}`")]
    InvalidRange { field: String, value: String },

    #[error("`{value}` is not a number (field `{field}`)")]
    InvalidNumber { field: String, value: String },

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{0}` is not filterable")]
    NotFilterable(String),

    #[error("field `{0}` is not sortable")]
    NotSortable(String),

    #[error("numeric comparison on non-numeric field `{0}`")]
    NonNumericComparison(String),

    #[error("ordering comparison on field `{0}` takes a single value")]
    OrderingOnList(String),

    #[error("at most {max} sort fields are allowed, got {found}", max = MAX_SORT_FIELDS)]
    TooManySortFields { found: usize },

    #[error("invalid sort direction `{direction}` for field `{field}`")]
    InvalidSortDirection { field: String, direction: String },

    #[error("sort entry `{0}` must look like field:asc or field:desc")]
    MalformedSort(String),
}
