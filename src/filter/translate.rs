// src/filter/translate.rs
//
// Backends consume a parsed filter through `PredicateVisitor`. Two ship here: SQL for the
// SQLite `current_offers` view, and an in-memory matcher over `Listing`.

use crate::domain::{Decimal, Listing};
use crate::filter::ast::{FilterNode, FilterValue};
use crate::filter::fields::{FilterField, Operator, SortField};
use crate::filter::sort::{SortClause, SortDirection};
use rusqlite::types::Value as SqlValue;
use std::cmp::Ordering;

/// Bottom-up fold over a filter tree. Children are visited left to right before their parent.
pub trait PredicateVisitor {
    type Output;

    fn visit_comparison(
        &mut self,
        field: FilterField,
        operator: Operator,
        value: &FilterValue,
    ) -> Self::Output;
    fn visit_in(&mut self, field: FilterField, values: &[FilterValue]) -> Self::Output;
    fn visit_and(&mut self, left: Self::Output, right: Self::Output) -> Self::Output;
    fn visit_or(&mut self, left: Self::Output, right: Self::Output) -> Self::Output;
    fn visit_not(&mut self, operand: Self::Output) -> Self::Output;
}

impl FilterNode {
    pub fn accept<V: PredicateVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            FilterNode::Comparison {
                field,
                operator,
                value,
            } => visitor.visit_comparison(*field, *operator, value),
            FilterNode::In { field, values } => visitor.visit_in(*field, values),
            FilterNode::And(left, right) => {
                let left = left.accept(visitor);
                let right = right.accept(visitor);
                visitor.visit_and(left, right)
            }
            FilterNode::Or(left, right) => {
                let left = left.accept(visitor);
                let right = right.accept(visitor);
                visitor.visit_or(left, right)
            }
            FilterNode::Not(operand) => {
                let operand = operand.accept(visitor);
                visitor.visit_not(operand)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

/// A WHERE fragment plus its positional parameters. User input only ever reaches SQLite
/// through `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Column in the `current_offers` view backing each field.
pub fn column(field: FilterField) -> &'static str {
    match field {
        FilterField::Uf => "uf",
        FilterField::City => "city",
        FilterField::Neighborhood => "neighborhood",
        FilterField::Address => "address",
        FilterField::Description => "description",
        FilterField::PropertyType => "property_type",
        FilterField::SellingType => "selling_type",
        FilterField::AskingPrice => "asking_price",
        FilterField::EvaluationPrice => "evaluation_price",
        FilterField::DiscountPercent => "discount_percent",
    }
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Field(field) => column(field),
        SortField::CreatedAt => "created_at",
    }
}

#[derive(Debug, Default)]
pub struct SqlTranslator {
    params: Vec<SqlValue>,
}

impl SqlTranslator {
    pub fn translate(node: &FilterNode) -> SqlPredicate {
        let mut translator = SqlTranslator::default();
        let sql = node.accept(&mut translator);
        SqlPredicate {
            sql,
            params: translator.params,
        }
    }

    fn bind(&mut self, value: &FilterValue) {
        self.params.push(match value {
            FilterValue::Text(s) => SqlValue::Text(s.clone()),
            FilterValue::Number(n) => SqlValue::Integer(n.micros()),
        });
    }
}

/// Escapes GLOB metacharacters so the text matches literally.
fn glob_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' => out.push_str("[*]"),
            '?' => out.push_str("[?]"),
            '[' => out.push_str("[[]"),
            c => out.push(c),
        }
    }
    out
}

impl PredicateVisitor for SqlTranslator {
    type Output = String;

    fn visit_comparison(
        &mut self,
        field: FilterField,
        operator: Operator,
        value: &FilterValue,
    ) -> String {
        let col = column(field);

        // GLOB rather than LIKE: case-sensitive, same as the in-memory matcher.
        let pattern = match (operator, value) {
            (Operator::Contains, FilterValue::Text(s)) => Some(format!("*{}*", glob_literal(s))),
            (Operator::StartsWith, FilterValue::Text(s)) => Some(format!("{}*", glob_literal(s))),
            (Operator::EndsWith, FilterValue::Text(s)) => Some(format!("*{}", glob_literal(s))),
            _ => None,
        };
        if let Some(pattern) = pattern {
            self.params.push(SqlValue::Text(pattern));
            return format!("{col} GLOB ?");
        }

        let sql_op = match operator {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            // Substring operators on a number never leave the parser.
            Operator::Le | Operator::Contains | Operator::StartsWith | Operator::EndsWith => "<=",
        };
        self.bind(value);
        format!("{col} {sql_op} ?")
    }

    fn visit_in(&mut self, field: FilterField, values: &[FilterValue]) -> String {
        for value in values {
            self.bind(value);
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        format!("{} IN ({placeholders})", column(field))
    }

    fn visit_and(&mut self, left: String, right: String) -> String {
        format!("({left} AND {right})")
    }

    fn visit_or(&mut self, left: String, right: String) -> String {
        format!("({left} OR {right})")
    }

    fn visit_not(&mut self, operand: String) -> String {
        format!("NOT ({operand})")
    }
}

/// ORDER BY clause for the read API. `source_id` is always the final key so paging is stable.
pub fn order_by_sql(clauses: &[SortClause]) -> String {
    let mut keys: Vec<String> = clauses
        .iter()
        .map(|c| {
            let dir = match c.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {dir}", sort_column(c.field))
        })
        .collect();
    if keys.is_empty() {
        keys.push("created_at DESC".to_string());
    }
    keys.push("source_id ASC".to_string());
    format!("ORDER BY {}", keys.join(", "))
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

enum FieldValue<'a> {
    Text(&'a str),
    Number(Decimal),
}

fn field_value(listing: &Listing, field: FilterField) -> FieldValue<'_> {
    match field {
        FilterField::Uf => FieldValue::Text(&listing.uf),
        FilterField::City => FieldValue::Text(&listing.city),
        FilterField::Neighborhood => FieldValue::Text(&listing.neighborhood),
        FilterField::Address => FieldValue::Text(&listing.address),
        FilterField::Description => FieldValue::Text(&listing.description),
        FilterField::PropertyType => FieldValue::Text(&listing.property_type),
        FilterField::SellingType => FieldValue::Text(&listing.selling_type),
        FilterField::AskingPrice => FieldValue::Number(listing.asking_price),
        FilterField::EvaluationPrice => FieldValue::Number(listing.evaluation_price),
        FilterField::DiscountPercent => FieldValue::Number(listing.discount_percent),
    }
}

/// Evaluates a filter against one listing.
pub struct ListingMatcher<'a> {
    listing: &'a Listing,
}

impl<'a> ListingMatcher<'a> {
    pub fn new(listing: &'a Listing) -> Self {
        Self { listing }
    }

    pub fn matches(node: &FilterNode, listing: &Listing) -> bool {
        node.accept(&mut ListingMatcher::new(listing))
    }

    fn compare(&self, field: FilterField, value: &FilterValue) -> Option<Ordering> {
        match (field_value(self.listing, field), value) {
            (FieldValue::Text(actual), FilterValue::Text(expected)) => {
                Some(actual.cmp(expected.as_str()))
            }
            (FieldValue::Number(actual), FilterValue::Number(expected)) => {
                Some(actual.cmp(expected))
            }
            _ => None,
        }
    }
}

impl PredicateVisitor for ListingMatcher<'_> {
    type Output = bool;

    fn visit_comparison(&mut self, field: FilterField, operator: Operator, value: &FilterValue) -> bool {
        if operator.is_text_only() {
            let (FieldValue::Text(actual), FilterValue::Text(expected)) =
                (field_value(self.listing, field), value)
            else {
                return false;
            };
            return match operator {
                Operator::Contains => actual.contains(expected.as_str()),
                Operator::StartsWith => actual.starts_with(expected.as_str()),
                _ => actual.ends_with(expected.as_str()),
            };
        }

        let Some(ordering) = self.compare(field, value) else {
            return false;
        };
        match operator {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            _ => ordering != Ordering::Greater,
        }
    }

    fn visit_in(&mut self, field: FilterField, values: &[FilterValue]) -> bool {
        values
            .iter()
            .any(|v| self.compare(field, v) == Some(Ordering::Equal))
    }

    fn visit_and(&mut self, left: bool, right: bool) -> bool {
        left && right
    }

    fn visit_or(&mut self, left: bool, right: bool) -> bool {
        left || right
    }

    fn visit_not(&mut self, operand: bool) -> bool {
        !operand
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse_filter;
    use crate::filter::sort::parse_sort;

    fn listing() -> Listing {
        serde_json::from_value(serde_json::json!({
            "sourceId": "1444400001",
            "uf": "SP",
            "city": "SANTOS",
            "neighborhood": "GONZAGA",
            "address": "AV ANA COSTA, 100",
            "description": "Apartamento, 2 quartos, 1 vaga",
            "propertyType": "Apartamento",
            "sellingType": "Leilao SFI",
            "askingPrice": "180000.00",
            "evaluationPrice": 300000,
            "discountPercent": "40"
        }))
        .unwrap()
    }

    #[test]
    fn translates_to_parameterized_sql() {
        let node = parse_filter("uf eq 'SP' and (askingPrice ge 100000 or discountPercent gt 30)")
            .unwrap();
        let predicate = SqlTranslator::translate(&node);
        assert_eq!(
            predicate.sql,
            "(uf = ? AND (asking_price >= ? OR discount_percent > ?))"
        );
        assert_eq!(
            predicate.params,
            vec![
                SqlValue::Text("SP".to_string()),
                SqlValue::Integer(100_000_000_000),
                SqlValue::Integer(30_000_000),
            ]
        );
    }

    #[test]
    fn translates_in_and_not() {
        let node = parse_filter("not city in ('A', 'B')").unwrap();
        let predicate = SqlTranslator::translate(&node);
        assert_eq!(predicate.sql, "NOT (city IN (?, ?))");
        assert_eq!(predicate.params.len(), 2);
    }

    #[test]
    fn substring_operators_escape_glob_metacharacters() {
        let node = parse_filter("description contains '50*[x]?'").unwrap();
        let predicate = SqlTranslator::translate(&node);
        assert_eq!(predicate.sql, "description GLOB ?");
        assert_eq!(
            predicate.params,
            vec![SqlValue::Text("*50[*][[]x][?]*".to_string())]
        );

        let node = parse_filter("city startswith 'SAN'").unwrap();
        assert_eq!(
            SqlTranslator::translate(&node).params,
            vec![SqlValue::Text("SAN*".to_string())]
        );
    }

    #[test]
    fn order_by_appends_stable_tiebreaker() {
        let clauses = parse_sort("askingPrice desc, city").unwrap();
        assert_eq!(
            order_by_sql(&clauses),
            "ORDER BY asking_price DESC, city ASC, source_id ASC"
        );
        assert_eq!(order_by_sql(&[]), "ORDER BY created_at DESC, source_id ASC");
    }

    #[test]
    fn matcher_evaluates_listing() {
        let listing = listing();
        let cases = [
            ("uf eq 'SP'", true),
            ("uf eq 'sp'", false),
            ("askingPrice eq 180000", true),
            ("askingPrice lt 180000.01 and evaluationPrice ge 300000", true),
            ("discountPercent gt 40", false),
            ("description contains '2 quartos'", true),
            ("city startswith 'SAN' and city endswith 'TOS'", true),
            ("neighborhood in ('CENTRO', 'GONZAGA')", true),
            ("not (uf eq 'SP' or uf eq 'RJ')", false),
            ("propertyType ne 'Casa'", true),
            ("city gt 'RIO'", true),
        ];
        for (filter, expected) in cases {
            let node = parse_filter(filter).unwrap();
            assert_eq!(ListingMatcher::matches(&node, &listing), expected, "{filter}");
        }
    }
}
