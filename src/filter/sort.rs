// src/filter/sort.rs

use crate::filter::fields::SortField;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortClause {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortParseError {
    #[error("sort expression must contain at least one field")]
    Empty,
    #[error("sort clause {position} is empty")]
    EmptyClause { position: usize },
    #[error("unknown sort field '{0}'")]
    UnknownField(String),
    #[error("invalid sort direction '{direction}' for field '{field}', expected 'asc' or 'desc'")]
    InvalidDirection { field: String, direction: String },
    #[error("unexpected '{token}' in sort clause '{clause}'")]
    TrailingInput { clause: String, token: String },
}

/// Parses `field [asc|desc] (, field [asc|desc])*` into ordered sort keys.
///
/// Duplicate fields are kept as written; the first occurrence decides the order.
pub fn parse_sort(input: &str) -> Result<Vec<SortClause>, SortParseError> {
    if input.trim().is_empty() {
        return Err(SortParseError::Empty);
    }

    input
        .split(',')
        .enumerate()
        .map(|(i, clause)| parse_clause(i + 1, clause))
        .collect()
}

fn parse_clause(position: usize, clause: &str) -> Result<SortClause, SortParseError> {
    let mut parts = clause.split_whitespace();

    let name = parts
        .next()
        .ok_or(SortParseError::EmptyClause { position })?;
    let field =
        SortField::from_name(name).ok_or_else(|| SortParseError::UnknownField(name.to_string()))?;

    let direction = match parts.next() {
        None | Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        Some(other) => {
            return Err(SortParseError::InvalidDirection {
                field: name.to_string(),
                direction: other.to_string(),
            })
        }
    };

    if let Some(extra) = parts.next() {
        return Err(SortParseError::TrailingInput {
            clause: clause.trim().to_string(),
            token: extra.to_string(),
        });
    }

    Ok(SortClause { field, direction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fields::FilterField;

    #[test]
    fn parses_fields_and_directions() {
        let clauses = parse_sort("uf asc, askingPrice desc").unwrap();
        assert_eq!(
            clauses,
            vec![
                SortClause {
                    field: SortField::Field(FilterField::Uf),
                    direction: SortDirection::Asc
                },
                SortClause {
                    field: SortField::Field(FilterField::AskingPrice),
                    direction: SortDirection::Desc
                },
            ]
        );
    }

    #[test]
    fn direction_defaults_to_ascending() {
        let clauses = parse_sort("  createdAt ").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, SortField::CreatedAt);
        assert_eq!(clauses[0].direction, SortDirection::Asc);
    }

    #[test]
    fn empty_input_needs_a_field() {
        assert_eq!(parse_sort(""), Err(SortParseError::Empty));
        assert_eq!(parse_sort("   "), Err(SortParseError::Empty));
        assert!(SortParseError::Empty.to_string().contains("at least one field"));
    }

    #[test]
    fn unknown_field_is_named() {
        let err = parse_sort("unknownField").unwrap_err();
        assert_eq!(err, SortParseError::UnknownField("unknownField".to_string()));
        assert!(err.to_string().contains("unknownField"));
    }

    #[test]
    fn bad_direction_is_a_distinct_error() {
        assert_eq!(
            parse_sort("city DESC"),
            Err(SortParseError::InvalidDirection {
                field: "city".to_string(),
                direction: "DESC".to_string()
            })
        );
        assert!(matches!(
            parse_sort("city asc desc"),
            Err(SortParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn empty_clause_is_rejected() {
        assert_eq!(
            parse_sort("city,,uf"),
            Err(SortParseError::EmptyClause { position: 2 })
        );
        assert_eq!(
            parse_sort("city,"),
            Err(SortParseError::EmptyClause { position: 2 })
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let clauses = parse_sort("city asc, city desc").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].direction, SortDirection::Desc);
    }
}
