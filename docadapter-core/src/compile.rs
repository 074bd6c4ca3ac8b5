//! Filter compilation.
//!
//! [`FilterCompiler`] turns a parsed [`FilterNode`] tree into a [`Predicate`]. Compilation is
//! a pure recursive walk; the rules worth knowing:
//!
//! - an absent or operator-less filter compiles to [`Predicate::Always`]
//! - empty combinators, empty `$hasSome` lists, empty substring values and empty token
//!   lists compile to [`Predicate::Empty`], which callers treat as "no constraint"
//! - empty children are dropped from `$and`/`$or`, and negating an empty fragment stays empty
//! - `$eq` against null is a null test
//! - date wrappers and ISO-8601 strings in values are compared as native dates

use bson::Bson;
use serde_json::Value;

use crate::{
    date::DateCodec,
    error::{AdapterError, AdapterResult},
    filter::{Combinator, FieldName, FilterNode, LeafOp},
    predicate::{CompareOp, LikeKind, Predicate},
};

/// Separator class between tokens of a `$urlized` pattern.
const TOKEN_SEPARATOR: &str = "[- ]";

pub struct FilterCompiler;

impl FilterCompiler {
    /// Compiles an optional filter tree.
    pub fn compile(node: Option<&FilterNode>) -> AdapterResult<Predicate> {
        match node {
            Some(node) => Self::compile_node(node),
            None => Ok(Predicate::Always),
        }
    }

    /// Parses and compiles a filter in its wire form.
    pub fn compile_json(filter: Option<&Value>) -> AdapterResult<Predicate> {
        match filter {
            Some(filter) => Self::compile_node(&FilterNode::from_json(filter)?),
            None => Ok(Predicate::Always),
        }
    }

    fn compile_node(node: &FilterNode) -> AdapterResult<Predicate> {
        match node {
            FilterNode::Unconstrained => Ok(Predicate::Always),
            FilterNode::Combinator { op: Combinator::And, children } => Self::join(children, Predicate::And),
            FilterNode::Combinator { op: Combinator::Or, children } => Self::join(children, Predicate::Or),
            FilterNode::Combinator { op: Combinator::Not, children } => {
                let child = match children.as_slice() {
                    [child] => Self::compile_node(child)?,
                    _ => {
                        return Err(AdapterError::BadRequest(
                            "Filter $not expects exactly one filter".into(),
                        ));
                    }
                };

                Ok(if child.is_empty() {
                    Predicate::Empty
                } else {
                    Predicate::Not(Box::new(child))
                })
            }
            FilterNode::Leaf { op, field, value } => Self::compile_leaf(*op, field, value),
        }
    }

    fn join(children: &[FilterNode], combine: fn(Vec<Predicate>) -> Predicate) -> AdapterResult<Predicate> {
        let compiled = children
            .iter()
            .map(Self::compile_node)
            .filter(|child| !child.as_ref().is_ok_and(Predicate::is_empty))
            .collect::<AdapterResult<Vec<_>>>()?;

        Ok(if compiled.is_empty() {
            Predicate::Empty
        } else {
            combine(compiled)
        })
    }

    fn compile_leaf(op: LeafOp, field: &FieldName, value: &Bson) -> AdapterResult<Predicate> {
        let field = field.clone();

        Ok(match op {
            LeafOp::Eq if is_absent(value) => Predicate::IsNull(field),
            LeafOp::Ne if is_absent(value) => Predicate::Not(Box::new(Predicate::IsNull(field))),
            LeafOp::Eq => compare(field, CompareOp::Eq, value),
            LeafOp::Ne => compare(field, CompareOp::Ne, value),
            LeafOp::Lt => compare(field, CompareOp::Lt, value),
            LeafOp::Lte => compare(field, CompareOp::Lte, value),
            LeafOp::Gt => compare(field, CompareOp::Gt, value),
            LeafOp::Gte => compare(field, CompareOp::Gte, value),
            LeafOp::In => {
                let values = match value {
                    Bson::Null => Vec::new(),
                    Bson::Array(values) => values
                        .iter()
                        .cloned()
                        .map(DateCodec::decode_value)
                        .collect(),
                    single => vec![DateCodec::decode_value(single.clone())],
                };

                if values.is_empty() {
                    Predicate::Empty
                } else {
                    Predicate::In { field, values }
                }
            }
            LeafOp::Contains => like(field, LikeKind::Contains, value, "$contains")?,
            LeafOp::StartsWith => like(field, LikeKind::StartsWith, value, "$startsWith")?,
            LeafOp::EndsWith => like(field, LikeKind::EndsWith, value, "$endsWith")?,
            LeafOp::MatchesPattern => {
                let tokens = match value {
                    Bson::Null => Vec::new(),
                    Bson::Array(tokens) => tokens
                        .iter()
                        .map(|token| match token {
                            Bson::String(token) => Ok(regex::escape(&token.to_lowercase())),
                            _ => Err(AdapterError::BadRequest(
                                "Filter $urlized expects a list of strings".into(),
                            )),
                        })
                        .collect::<AdapterResult<Vec<_>>>()?,
                    _ => {
                        return Err(AdapterError::BadRequest(
                            "Filter $urlized expects a list of strings".into(),
                        ));
                    }
                };

                if tokens.is_empty() {
                    Predicate::Empty
                } else {
                    Predicate::Pattern { field, pattern: tokens.join(TOKEN_SEPARATOR) }
                }
            }
        })
    }
}

fn is_absent(value: &Bson) -> bool {
    matches!(value, Bson::Null | Bson::Undefined)
}

fn compare(field: FieldName, op: CompareOp, value: &Bson) -> Predicate {
    Predicate::Compare {
        field,
        op,
        value: DateCodec::decode_value(value.clone()),
    }
}

fn like(field: FieldName, kind: LikeKind, value: &Bson, tag: &str) -> AdapterResult<Predicate> {
    let text = match value {
        Bson::Null | Bson::Undefined => String::new(),
        Bson::String(text) => text.clone(),
        Bson::Boolean(value) => value.to_string(),
        Bson::Int32(value) => value.to_string(),
        Bson::Int64(value) => value.to_string(),
        Bson::Double(value) => value.to_string(),
        _ => {
            return Err(AdapterError::BadRequest(format!("Filter {tag} expects a scalar value")));
        }
    };

    Ok(if text.is_empty() {
        Predicate::Empty
    } else {
        Predicate::Like { field, kind, value: text }
    })
}
