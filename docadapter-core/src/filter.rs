//! Wire model of filter trees.
//!
//! A filter arrives as JSON shaped like `{ "operator": "<tag>", "fieldName": "...", "value": ... }`.
//! Combinators (`$and`, `$or`, `$not`) carry their children in `value`; leaves compare the
//! named field against `value`. Parsing validates the shape, the operator tag and the field
//! name, so the compiler in [`crate::compile`] only ever sees well-formed trees.
//!
//! # Example
//!
//! ```ignore
//! use docadapter_core::filter::FilterNode;
//! use serde_json::json;
//!
//! let node = FilterNode::from_json(&json!({
//!     "operator": "$and",
//!     "value": [
//!         { "operator": "$eq", "fieldName": "status", "value": "active" },
//!         { "operator": "$gt", "fieldName": "age", "value": 18 },
//!     ],
//! }))?;
//! ```

use std::{fmt, str::FromStr, sync::OnceLock};

use bson::Bson;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::{AdapterError, AdapterResult},
    item::{ID_FIELD, bson_from_json},
};

const FIELD_NAME_PATTERN: &str = r"^[A-Za-z0-9_]+$";

fn field_name_regex() -> &'static Regex {
    static FIELD_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    FIELD_NAME_REGEX.get_or_init(|| Regex::new(FIELD_NAME_PATTERN).expect("field name pattern is valid"))
}

/// A validated field identifier.
///
/// Field names are structural: they are written into compiled predicates and ordering
/// clauses as-is, never escaped as literals. Only ASCII letters, digits and underscores are
/// accepted so a field name can never alter the structure of what it is written into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldName(String);

impl FieldName {
    /// Validates a field name against the allow-list.
    pub fn parse(name: &str) -> AdapterResult<Self> {
        if field_name_regex().is_match(name) {
            Ok(FieldName(name.to_string()))
        } else {
            Err(AdapterError::BadRequest(format!("Invalid field name '{name}'")))
        }
    }

    /// The identifier field, `_id`.
    pub fn id() -> Self {
        FieldName(ID_FIELD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical operators joining child filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// All children must match.
    And,
    /// Any child must match.
    Or,
    /// The single child must not match.
    Not,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOp {
    /// Equal to; equality with null is a null test.
    Eq,
    /// Not equal to.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Field equals one of the listed values (`$hasSome`).
    In,
    /// Substring match.
    Contains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Case-insensitive match of URL-style tokens (`$urlized`).
    MatchesPattern,
}

/// Any operator tag a filter node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Combinator(Combinator),
    Leaf(LeafOp),
}

impl Operator {
    /// The wire tag of this operator.
    pub fn tag(&self) -> &'static str {
        match self {
            Operator::Combinator(Combinator::And) => "$and",
            Operator::Combinator(Combinator::Or) => "$or",
            Operator::Combinator(Combinator::Not) => "$not",
            Operator::Leaf(LeafOp::Eq) => "$eq",
            Operator::Leaf(LeafOp::Ne) => "$ne",
            Operator::Leaf(LeafOp::Lt) => "$lt",
            Operator::Leaf(LeafOp::Lte) => "$lte",
            Operator::Leaf(LeafOp::Gt) => "$gt",
            Operator::Leaf(LeafOp::Gte) => "$gte",
            Operator::Leaf(LeafOp::In) => "$hasSome",
            Operator::Leaf(LeafOp::Contains) => "$contains",
            Operator::Leaf(LeafOp::StartsWith) => "$startsWith",
            Operator::Leaf(LeafOp::EndsWith) => "$endsWith",
            Operator::Leaf(LeafOp::MatchesPattern) => "$urlized",
        }
    }
}

impl FromStr for Operator {
    type Err = AdapterError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag {
            "$and" => Operator::Combinator(Combinator::And),
            "$or" => Operator::Combinator(Combinator::Or),
            "$not" => Operator::Combinator(Combinator::Not),
            "$eq" => Operator::Leaf(LeafOp::Eq),
            "$ne" => Operator::Leaf(LeafOp::Ne),
            "$lt" => Operator::Leaf(LeafOp::Lt),
            "$lte" => Operator::Leaf(LeafOp::Lte),
            "$gt" => Operator::Leaf(LeafOp::Gt),
            "$gte" => Operator::Leaf(LeafOp::Gte),
            "$hasSome" => Operator::Leaf(LeafOp::In),
            "$contains" => Operator::Leaf(LeafOp::Contains),
            "$startsWith" => Operator::Leaf(LeafOp::StartsWith),
            "$endsWith" => Operator::Leaf(LeafOp::EndsWith),
            "$urlized" => Operator::Leaf(LeafOp::MatchesPattern),
            other => return Err(AdapterError::UnsupportedOperator(other.to_string())),
        })
    }
}

/// A node of a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// A node without an operator; places no constraint.
    Unconstrained,
    /// Logical combination of child nodes. `Not` always has exactly one child.
    Combinator {
        op: Combinator,
        children: Vec<FilterNode>,
    },
    /// Comparison of one field against a value. An absent value is `Bson::Null`.
    Leaf {
        op: LeafOp,
        field: FieldName,
        value: Bson,
    },
}

impl FilterNode {
    /// Parses a filter tree from its wire form.
    ///
    /// `null` and objects without an `operator` parse as [`FilterNode::Unconstrained`].
    ///
    /// # Errors
    ///
    /// - [`AdapterError::UnsupportedOperator`] for unknown operator tags
    /// - [`AdapterError::BadRequest`] for malformed nodes, invalid field names, or a `$not`
    ///   without exactly one child
    pub fn from_json(value: &Value) -> AdapterResult<Self> {
        let node = match value {
            Value::Null => return Ok(FilterNode::Unconstrained),
            Value::Object(node) => node,
            _ => return Err(AdapterError::BadRequest("Filter must be an object".into())),
        };

        let operator = match node.get("operator") {
            None | Some(Value::Null) => return Ok(FilterNode::Unconstrained),
            Some(Value::String(tag)) => tag.parse::<Operator>()?,
            Some(other) => {
                return Err(AdapterError::BadRequest(format!("Invalid filter operator {other}")));
            }
        };

        match operator {
            Operator::Combinator(op) => Self::parse_combinator(op, node.get("value")),
            Operator::Leaf(op) => {
                let field = match node.get("fieldName") {
                    Some(Value::String(name)) => FieldName::parse(name)?,
                    _ => {
                        return Err(AdapterError::BadRequest(format!(
                            "Missing fieldName in {} filter",
                            operator.tag()
                        )));
                    }
                };
                let value = bson_from_json(node.get("value").cloned().unwrap_or(Value::Null))?;

                Ok(FilterNode::Leaf { op, field, value })
            }
        }
    }

    fn parse_combinator(op: Combinator, value: Option<&Value>) -> AdapterResult<Self> {
        let children = match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(children)) => children
                .iter()
                .map(FilterNode::from_json)
                .collect::<AdapterResult<Vec<_>>>()?,
            // A lone child object is accepted for `$not`.
            Some(child @ Value::Object(_)) if op == Combinator::Not => vec![FilterNode::from_json(child)?],
            Some(_) => {
                return Err(AdapterError::BadRequest(format!(
                    "Filter {} expects a list of filters",
                    Operator::Combinator(op).tag()
                )));
            }
        };

        if op == Combinator::Not && children.len() != 1 {
            return Err(AdapterError::BadRequest(format!(
                "Filter $not expects exactly one filter, got {}",
                children.len()
            )));
        }

        Ok(FilterNode::Combinator { op, children })
    }

    /// Returns the operator of this node, if it has one.
    pub fn operator(&self) -> Option<Operator> {
        match self {
            FilterNode::Unconstrained => None,
            FilterNode::Combinator { op, .. } => Some(Operator::Combinator(*op)),
            FilterNode::Leaf { op, .. } => Some(Operator::Leaf(*op)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_trees() {
        let node = FilterNode::from_json(&json!({
            "operator": "$or",
            "value": [
                { "operator": "$eq", "fieldName": "status", "value": "active" },
                { "operator": "$not", "value": [{ "operator": "$lt", "fieldName": "age", "value": 18 }] },
            ],
        }))
        .unwrap();

        let FilterNode::Combinator { op, children } = node else {
            panic!("expected a combinator");
        };
        assert_eq!(op, Combinator::Or);
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0],
            FilterNode::Leaf {
                op: LeafOp::Eq,
                field: FieldName::parse("status").unwrap(),
                value: Bson::String("active".into()),
            }
        );
        assert_eq!(children[1].operator(), Some(Operator::Combinator(Combinator::Not)));
    }

    #[test]
    fn missing_operator_is_unconstrained() {
        assert_eq!(FilterNode::from_json(&json!(null)).unwrap(), FilterNode::Unconstrained);
        assert_eq!(FilterNode::from_json(&json!({})).unwrap(), FilterNode::Unconstrained);
        assert_eq!(
            FilterNode::from_json(&json!({ "operator": null, "fieldName": "x" })).unwrap(),
            FilterNode::Unconstrained
        );
    }

    #[test]
    fn unknown_operator_is_named_in_the_error() {
        let err = FilterNode::from_json(&json!({ "operator": "$near", "fieldName": "x", "value": 1 }))
            .unwrap_err();

        assert!(matches!(err, AdapterError::UnsupportedOperator(ref tag) if tag == "$near"));
    }

    #[test]
    fn absent_leaf_value_is_null() {
        let node = FilterNode::from_json(&json!({ "operator": "$eq", "fieldName": "deletedAt" })).unwrap();

        assert!(matches!(node, FilterNode::Leaf { value: Bson::Null, .. }));
    }

    #[test]
    fn not_requires_exactly_one_child() {
        let none = FilterNode::from_json(&json!({ "operator": "$not", "value": [] }));
        let two = FilterNode::from_json(&json!({
            "operator": "$not",
            "value": [
                { "operator": "$eq", "fieldName": "a", "value": 1 },
                { "operator": "$eq", "fieldName": "b", "value": 2 },
            ],
        }));
        let lone = FilterNode::from_json(&json!({
            "operator": "$not",
            "value": { "operator": "$eq", "fieldName": "a", "value": 1 },
        }));

        assert!(matches!(none, Err(AdapterError::BadRequest(_))));
        assert!(matches!(two, Err(AdapterError::BadRequest(_))));
        assert!(lone.is_ok());
    }

    #[test]
    fn field_names_outside_the_allow_list_are_rejected() {
        for name in ["a.b", "$where", "name'; DROP TABLE x; --", "a b", ""] {
            let result = FilterNode::from_json(&json!({ "operator": "$eq", "fieldName": name, "value": 1 }));

            assert!(matches!(result, Err(AdapterError::BadRequest(_))), "accepted {name:?}");
        }
    }

    #[test]
    fn leaf_without_field_name_is_rejected() {
        let result = FilterNode::from_json(&json!({ "operator": "$gt", "value": 1 }));

        assert!(matches!(result, Err(AdapterError::BadRequest(_))));
    }

    #[test]
    fn tags_round_trip() {
        for tag in ["$and", "$or", "$not", "$eq", "$ne", "$lt", "$lte", "$gt", "$gte", "$hasSome", "$contains", "$startsWith", "$endsWith", "$urlized"] {
            assert_eq!(tag.parse::<Operator>().unwrap().tag(), tag);
        }
    }
}
