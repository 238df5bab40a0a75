// src/filter/fields.rs

use std::fmt;

/// Value type a field accepts in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Numeric,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => f.write_str("text"),
            FieldType::Numeric => f.write_str("numeric"),
        }
    }
}

/// Offer attributes a filter may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Uf,
    City,
    Neighborhood,
    Address,
    Description,
    PropertyType,
    SellingType,
    AskingPrice,
    EvaluationPrice,
    DiscountPercent,
}

impl FilterField {
    pub const ALL: [FilterField; 10] = [
        FilterField::Uf,
        FilterField::City,
        FilterField::Neighborhood,
        FilterField::Address,
        FilterField::Description,
        FilterField::PropertyType,
        FilterField::SellingType,
        FilterField::AskingPrice,
        FilterField::EvaluationPrice,
        FilterField::DiscountPercent,
    ];

    /// Name as written in filter and sort expressions.
    pub fn name(self) -> &'static str {
        match self {
            FilterField::Uf => "uf",
            FilterField::City => "city",
            FilterField::Neighborhood => "neighborhood",
            FilterField::Address => "address",
            FilterField::Description => "description",
            FilterField::PropertyType => "propertyType",
            FilterField::SellingType => "sellingType",
            FilterField::AskingPrice => "askingPrice",
            FilterField::EvaluationPrice => "evaluationPrice",
            FilterField::DiscountPercent => "discountPercent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn field_type(self) -> FieldType {
        match self {
            FilterField::AskingPrice | FilterField::EvaluationPrice | FilterField::DiscountPercent => {
                FieldType::Numeric
            }
            _ => FieldType::Text,
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Ge,
        Operator::Lt,
        Operator::Le,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Substring operators only make sense on text fields.
    pub fn is_text_only(self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields accepted by sort expressions: every filter field plus the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Field(FilterField),
    CreatedAt,
}

impl SortField {
    pub fn name(self) -> &'static str {
        match self {
            SortField::Field(field) => field.name(),
            SortField::CreatedAt => "createdAt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name == "createdAt" {
            return Some(SortField::CreatedAt);
        }
        FilterField::from_name(name).map(SortField::Field)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
