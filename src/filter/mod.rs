pub mod ast;
pub mod fields;
pub mod parser;
pub mod sort;
pub mod tokenizer;
pub mod translate;

pub use ast::{FilterNode, FilterValue};
pub use fields::{FieldType, FilterField, Operator, SortField};
pub use parser::{parse_filter, FilterParseError, MAX_NESTING_DEPTH};
pub use sort::{parse_sort, SortClause, SortDirection, SortParseError};
pub use tokenizer::{tokenize, Token, TokenKind, TokenizeError};
pub use translate::{ListingMatcher, PredicateVisitor, SqlPredicate, SqlTranslator};
