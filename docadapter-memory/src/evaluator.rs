//! Predicate evaluation for in-memory item filtering.
//!
//! This module walks compiled predicates against BSON items, and provides the value
//! ordering used when sorting.

use std::{
    cmp::Ordering,
    collections::{HashMap, hash_map::Entry},
};

use bson::{Bson, DateTime};
use regex::{Regex, RegexBuilder};

use docadapter_core::{
    error::{AdapterError, AdapterResult},
    filter::FieldName,
    item::Item,
    predicate::{CompareOp, LikeKind, Predicate, PredicateVisitor},
    sort::{OrderClause, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so `1`, `1i64` and `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect()
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> Comparable<'a> {
    fn of(value: Option<&'a Bson>) -> Self {
        value.map(Comparable::from).unwrap_or(Comparable::Null)
    }

    /// Rank of the value's type when values of different types are ordered.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Bool(_) => 5,
            Comparable::DateTime(_) => 6,
        }
    }

    /// Total order used for sorting: nulls first, then by type, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank()))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Orders two items by an ordering clause. Ties keep their relative order under a stable sort.
pub(crate) fn compare_items(order: &OrderClause, left: &Item, right: &Item) -> Ordering {
    for entry in order.entries() {
        let field = entry.field.as_str();
        let ordering = Comparable::of(left.get(field)).sort_cmp(&Comparable::of(right.get(field)));
        let ordering = match entry.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Evaluates predicates against one item at a time.
///
/// Compiled regular expressions are cached for the lifetime of the evaluator, so one evaluator
/// should be reused across a whole scan.
#[derive(Default)]
pub(crate) struct PredicateEvaluator<'a> {
    item: Option<&'a Item>,
    patterns: HashMap<String, Regex>,
}

impl<'a> PredicateEvaluator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `item` satisfies `predicate`.
    pub fn matches(&mut self, item: &'a Item, predicate: &Predicate) -> AdapterResult<bool> {
        self.item = Some(item);
        self.visit(predicate)
    }

    fn field(&self, field: &FieldName) -> Option<&'a Bson> {
        self.item.and_then(|item| item.get(field.as_str()))
    }

    fn regex(&mut self, pattern: &str) -> AdapterResult<&Regex> {
        match self.patterns.entry(pattern.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| AdapterError::BadRequest(format!("Invalid pattern: {err}")))?;

                Ok(entry.insert(regex))
            }
        }
    }
}

fn equals(stored: Option<&Bson>, value: &Bson) -> bool {
    let expected = Comparable::from(value);

    match Comparable::of(stored) {
        Comparable::Array(values) if !matches!(expected, Comparable::Array(_)) => {
            values.iter().any(|item| item == &expected)
        }
        actual => actual == expected,
    }
}

fn like(stored: Option<&Bson>, kind: LikeKind, value: &str) -> bool {
    let Some(Bson::String(stored)) = stored else {
        return false;
    };
    let stored = stored.to_lowercase();
    let value = value.to_lowercase();

    match kind {
        LikeKind::Contains => stored.contains(&value),
        LikeKind::StartsWith => stored.starts_with(&value),
        LikeKind::EndsWith => stored.ends_with(&value),
    }
}

impl PredicateVisitor for PredicateEvaluator<'_> {
    type Output = bool;
    type Error = AdapterError;

    fn visit_unconstrained(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(true)
    }

    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error> {
        for predicate in predicates {
            if !self.visit(predicate)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error> {
        for predicate in predicates {
            if self.visit(predicate)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit(predicate)?)
    }

    fn visit_is_null(&mut self, field: &FieldName) -> Result<Self::Output, Self::Error> {
        Ok(matches!(self.field(field), None | Some(Bson::Null)))
    }

    fn visit_compare(
        &mut self,
        field: &FieldName,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let stored = self.field(field);

        Ok(match op {
            CompareOp::Eq => equals(stored, value),
            CompareOp::Ne => !equals(stored, value),
            CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
                let Some(stored) = stored else {
                    return Ok(false);
                };

                match Comparable::from(stored).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        CompareOp::Lt => ordering.is_lt(),
                        CompareOp::Lte => ordering.is_le(),
                        CompareOp::Gt => ordering.is_gt(),
                        _ => ordering.is_ge(),
                    },
                    None => false,
                }
            }
        })
    }

    fn visit_in(&mut self, field: &FieldName, values: &[Bson]) -> Result<Self::Output, Self::Error> {
        let stored = self.field(field);

        Ok(values.iter().any(|value| equals(stored, value)))
    }

    fn visit_like(
        &mut self,
        field: &FieldName,
        kind: LikeKind,
        value: &str,
    ) -> Result<Self::Output, Self::Error> {
        Ok(like(self.field(field), kind, value))
    }

    fn visit_pattern(&mut self, field: &FieldName, pattern: &str) -> Result<Self::Output, Self::Error> {
        let Some(Bson::String(stored)) = self.field(field) else {
            return Ok(false);
        };
        let stored = stored.to_lowercase();

        Ok(self.regex(pattern)?.is_match(&stored))
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docadapter_core::compile::FilterCompiler;
    use serde_json::{Value, json};

    use super::*;

    fn check(filter: Value, item: &Item) -> bool {
        let predicate = FilterCompiler::compile_json(Some(&filter)).unwrap();
        PredicateEvaluator::new().matches(item, &predicate).unwrap()
    }

    #[test]
    fn numbers_compare_across_widths() {
        let item = doc! { "price": 12.5, "qty": 3i64 };

        assert!(check(json!({ "operator": "$gt", "fieldName": "price", "value": 10 }), &item));
        assert!(check(json!({ "operator": "$eq", "fieldName": "qty", "value": 3 }), &item));
        assert!(!check(json!({ "operator": "$lte", "fieldName": "price", "value": 12 }), &item));
    }

    #[test]
    fn null_tests_cover_missing_fields() {
        let item = doc! { "a": Bson::Null, "b": 1 };

        assert!(check(json!({ "operator": "$eq", "fieldName": "a", "value": null }), &item));
        assert!(check(json!({ "operator": "$eq", "fieldName": "missing", "value": null }), &item));
        assert!(check(json!({ "operator": "$ne", "fieldName": "b", "value": null }), &item));
        assert!(!check(json!({ "operator": "$ne", "fieldName": "a", "value": null }), &item));
    }

    #[test]
    fn substring_matches_ignore_case() {
        let item = doc! { "name": "Blue Widget" };

        assert!(check(json!({ "operator": "$contains", "fieldName": "name", "value": "widg" }), &item));
        assert!(check(json!({ "operator": "$startsWith", "fieldName": "name", "value": "BLUE" }), &item));
        assert!(check(json!({ "operator": "$endsWith", "fieldName": "name", "value": "get" }), &item));
        assert!(!check(json!({ "operator": "$startsWith", "fieldName": "name", "value": "widget" }), &item));
    }

    #[test]
    fn wildcards_in_substrings_are_literal() {
        let item = doc! { "code": "a_b" };

        assert!(check(json!({ "operator": "$contains", "fieldName": "code", "value": "_" }), &item));
        assert!(!check(json!({ "operator": "$contains", "fieldName": "code", "value": "%" }), &item));
    }

    #[test]
    fn has_some_matches_scalars_and_arrays() {
        let tagged = doc! { "tags": ["red", "blue"] };
        let colored = doc! { "color": "red" };

        assert!(check(json!({ "operator": "$hasSome", "fieldName": "tags", "value": ["green", "blue"] }), &tagged));
        assert!(check(json!({ "operator": "$hasSome", "fieldName": "color", "value": ["red"] }), &colored));
        assert!(!check(json!({ "operator": "$hasSome", "fieldName": "color", "value": ["green"] }), &colored));
    }

    #[test]
    fn urlized_tokens_match_dashes_or_spaces() {
        let item = doc! { "title": "Hello World-Wide" };

        assert!(check(json!({ "operator": "$urlized", "fieldName": "title", "value": ["hello", "world", "wide"] }), &item));
        assert!(!check(json!({ "operator": "$urlized", "fieldName": "title", "value": ["hello", "wide"] }), &item));
    }

    #[test]
    fn dates_compare_natively() {
        let item = doc! { "createdAt": DateTime::from_millis(1_704_067_200_000) };

        assert!(check(
            json!({ "operator": "$gte", "fieldName": "createdAt", "value": { "date": "2024-01-01T00:00:00.000" } }),
            &item
        ));
        assert!(!check(
            json!({ "operator": "$gt", "fieldName": "createdAt", "value": "2024-01-01T00:00:00.000Z" }),
            &item
        ));
    }

    #[test]
    fn combinators_compose() {
        let item = doc! { "a": 1, "b": 2 };
        let filter = json!({
            "operator": "$or",
            "value": [
                { "operator": "$eq", "fieldName": "a", "value": 5 },
                { "operator": "$not", "value": [{ "operator": "$eq", "fieldName": "b", "value": 3 }] },
            ],
        });

        assert!(check(filter, &item));
    }

    #[test]
    fn sort_order_puts_missing_values_first() {
        let order = docadapter_core::sort::SortCompiler::compile(
            &docadapter_core::sort::SortSpec::from_json(Some(&json!([{ "fieldName": "n", "direction": "asc" }]))).unwrap(),
        );
        let present = doc! { "n": 1 };
        let absent = doc! {};

        assert_eq!(compare_items(&order, &absent, &present), Ordering::Less);
        assert_eq!(compare_items(&order, &present, &present), Ordering::Equal);
    }
}
