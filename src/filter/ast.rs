// src/filter/ast.rs

use crate::domain::Decimal;
use crate::filter::fields::{FieldType, FilterField, Operator};
use std::fmt;

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Number(Decimal),
}

impl FilterValue {
    pub fn value_type(&self) -> FieldType {
        match self {
            FilterValue::Text(_) => FieldType::Text,
            FilterValue::Number(_) => FieldType::Numeric,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            FilterValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Parsed filter expression.
///
/// Only the parser builds these, so every value already matches its field's type and
/// text-only operators only appear on text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    Comparison {
        field: FilterField,
        operator: Operator,
        value: FilterValue,
    },
    In {
        field: FilterField,
        values: Vec<FilterValue>,
    },
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Or(Box::new(left), Box::new(right))
    }

    pub fn negate(operand: FilterNode) -> Self {
        FilterNode::Not(Box::new(operand))
    }
}

/// Renders the node back into filter syntax, fully parenthesized.
impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Comparison {
                field,
                operator,
                value,
            } => write!(f, "{field} {operator} {value}"),
            FilterNode::In { field, values } => {
                write!(f, "{field} in (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            FilterNode::And(left, right) => write!(f, "({left} and {right})"),
            FilterNode::Or(left, right) => write!(f, "({left} or {right})"),
            FilterNode::Not(operand) => write!(f, "not {operand}"),
        }
    }
}
