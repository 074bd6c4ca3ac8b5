//! Compiled predicates and their escaped text rendering.
//!
//! A [`Predicate`] is what the filter compiler hands to executors. Executors walk it with a
//! [`PredicateVisitor`] to build their native query form. Its [`Display`](fmt::Display)
//! implementation renders a relational-style fragment (`age >= 18 AND name = 'O\'Neil'`)
//! in which every literal is escaped; that text is what gets logged, and what a SQL-speaking
//! executor would consume.

use std::fmt::{self, Write};

use bson::{Bson, DateTime};

use crate::{error::AdapterError, filter::FieldName};

/// Relational comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// Where a substring has to occur for a [`Predicate::Like`] to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// A compiled, store-ready filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The empty fragment: no constraint.
    Empty,
    /// A constraint satisfied by every record.
    Always,
    /// Every child holds. Never empty.
    And(Vec<Predicate>),
    /// Some child holds. Never empty.
    Or(Vec<Predicate>),
    /// The child does not hold.
    Not(Box<Predicate>),
    /// The field is null or absent.
    IsNull(FieldName),
    /// The field compares to the value.
    Compare {
        field: FieldName,
        op: CompareOp,
        value: Bson,
    },
    /// The field equals one of the values. Never empty.
    In {
        field: FieldName,
        values: Vec<Bson>,
    },
    /// Case-insensitive substring match against the literal text `value`.
    Like {
        field: FieldName,
        kind: LikeKind,
        value: String,
    },
    /// Case-insensitive regular expression match. `pattern` is already escaped and lower-cased.
    Pattern {
        field: FieldName,
        pattern: String,
    },
}

impl Predicate {
    /// Equality on the identifier field.
    pub fn id_eq(id: &str) -> Self {
        Predicate::Compare {
            field: FieldName::id(),
            op: CompareOp::Eq,
            value: Bson::String(id.to_string()),
        }
    }

    /// Returns `true` when the predicate places no constraint at all.
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Predicate::Empty | Predicate::Always)
    }

    /// Returns `true` for the empty fragment.
    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::Empty)
    }
}

/// Walks a [`Predicate`], producing one output per node.
///
/// Both [`Predicate::Empty`] and [`Predicate::Always`] are dispatched to
/// [`visit_unconstrained`](PredicateVisitor::visit_unconstrained).
pub trait PredicateVisitor {
    type Output;
    type Error: Into<AdapterError>;

    fn visit_unconstrained(&mut self) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error>;
    fn visit_is_null(&mut self, field: &FieldName) -> Result<Self::Output, Self::Error>;
    fn visit_compare(
        &mut self,
        field: &FieldName,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_in(&mut self, field: &FieldName, values: &[Bson]) -> Result<Self::Output, Self::Error>;
    fn visit_like(
        &mut self,
        field: &FieldName,
        kind: LikeKind,
        value: &str,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_pattern(&mut self, field: &FieldName, pattern: &str) -> Result<Self::Output, Self::Error>;

    fn visit(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        match predicate {
            Predicate::Empty | Predicate::Always => self.visit_unconstrained(),
            Predicate::And(predicates) => self.visit_and(predicates),
            Predicate::Or(predicates) => self.visit_or(predicates),
            Predicate::Not(predicate) => self.visit_not(predicate),
            Predicate::IsNull(field) => self.visit_is_null(field),
            Predicate::Compare { field, op, value } => self.visit_compare(field, *op, value),
            Predicate::In { field, values } => self.visit_in(field, values),
            Predicate::Like { field, kind, value } => self.visit_like(field, *kind, value),
            Predicate::Pattern { field, pattern } => self.visit_pattern(field, pattern),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Empty => Ok(()),
            Predicate::Always => f.write_str("TRUE = TRUE"),
            Predicate::And(predicates) => write_joined(f, predicates, " AND "),
            Predicate::Or(predicates) => write_joined(f, predicates, " OR "),
            Predicate::Not(predicate) => write!(f, "NOT ({predicate})"),
            Predicate::IsNull(field) => write!(f, "{field} IS NULL"),
            Predicate::Compare { field, op, value } => {
                write!(f, "{field} {} {}", op.as_sql(), escape_literal(value))
            }
            Predicate::In { field, values } => {
                let list = values
                    .iter()
                    .map(escape_literal)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{field} IN ({list})")
            }
            Predicate::Like { field, kind, value } => {
                let value = escape_like(value);
                let pattern = match kind {
                    LikeKind::Contains => format!("%{value}%"),
                    LikeKind::StartsWith => format!("{value}%"),
                    LikeKind::EndsWith => format!("%{value}"),
                };
                write!(f, "{field} LIKE {}", escape_string(&pattern))
            }
            Predicate::Pattern { field, pattern } => {
                write!(f, "LOWER({field}) RLIKE {}", escape_string(pattern))
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], separator: &str) -> fmt::Result {
    f.write_char('(')?;
    for (index, predicate) in predicates.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{predicate}")?;
    }
    f.write_char(')')
}

/// Quotes a string literal, neutralising every character that could end it early.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');

    for ch in value.chars() {
        match ch {
            '\0' => escaped.push_str("\\0"),
            '\x08' => escaped.push_str("\\b"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\x1a' => escaped.push_str("\\Z"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            other => escaped.push(other),
        }
    }

    escaped.push('\'');
    escaped
}

/// Escapes LIKE wildcards so user text only ever matches literally.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn escape_date(date: &DateTime) -> String {
    match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(date.timestamp_millis()) {
        Some(date) => escape_string(&date.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
        None => "NULL".to_string(),
    }
}

/// Renders a value as an escaped literal.
pub fn escape_literal(value: &Bson) -> String {
    match value {
        Bson::Null | Bson::Undefined => "NULL".to_string(),
        Bson::Boolean(value) => value.to_string(),
        Bson::Int32(value) => value.to_string(),
        Bson::Int64(value) => value.to_string(),
        Bson::Double(value) if value.is_finite() => value.to_string(),
        Bson::Double(_) => "NULL".to_string(),
        Bson::String(value) => escape_string(value),
        Bson::DateTime(date) => escape_date(date),
        Bson::Array(values) => {
            let list = values
                .iter()
                .map(escape_literal)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({list})")
        }
        other => escape_string(&other.to_string()),
    }
}
