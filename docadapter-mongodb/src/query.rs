//! Translation of compiled predicates and orderings into MongoDB query documents.

use bson::{Bson, Document, doc};

use docadapter_core::{
    error::AdapterError,
    filter::FieldName,
    predicate::{CompareOp, LikeKind, Predicate, PredicateVisitor},
    sort::{OrderClause, SortDirection},
};

/// Translates predicates into MongoDB's native filter syntax.
///
/// Substring and pattern matches become case-insensitive `$regex` conditions; user text is
/// regex-escaped so it always matches literally. Negation uses `$nor`, which is valid at the
/// top level of a filter where `$not` is not.
pub(crate) struct MongoPredicateTranslator;

impl MongoPredicateTranslator {
    pub fn translate(predicate: &Predicate) -> Result<Document, AdapterError> {
        MongoPredicateTranslator.visit(predicate)
    }

    fn translate_all(&mut self, predicates: &[Predicate]) -> Result<Vec<Document>, AdapterError> {
        predicates
            .iter()
            .map(|predicate| self.visit(predicate))
            .collect()
    }
}

fn regex(pattern: String) -> Document {
    doc! { "$regex": pattern, "$options": "i" }
}

impl PredicateVisitor for MongoPredicateTranslator {
    type Output = Document;
    type Error = AdapterError;

    fn visit_unconstrained(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(doc! {})
    }

    fn visit_and(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$and": self.translate_all(predicates)? })
    }

    fn visit_or(&mut self, predicates: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$or": self.translate_all(predicates)? })
    }

    fn visit_not(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        let negated = self.visit(predicate)?;

        Ok(doc! { "$nor": [negated] })
    }

    fn visit_is_null(&mut self, field: &FieldName) -> Result<Self::Output, Self::Error> {
        // Matches both explicit nulls and missing fields.
        Ok(doc! { field.as_str(): Bson::Null })
    }

    fn visit_compare(
        &mut self,
        field: &FieldName,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
        };

        Ok(doc! { field.as_str(): { operator: value.clone() } })
    }

    fn visit_in(&mut self, field: &FieldName, values: &[Bson]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field.as_str(): { "$in": values.to_vec() } })
    }

    fn visit_like(
        &mut self,
        field: &FieldName,
        kind: LikeKind,
        value: &str,
    ) -> Result<Self::Output, Self::Error> {
        let escaped = regex::escape(value);
        let pattern = match kind {
            LikeKind::Contains => escaped,
            LikeKind::StartsWith => format!("^{escaped}"),
            LikeKind::EndsWith => format!("{escaped}$"),
        };

        Ok(doc! { field.as_str(): regex(pattern) })
    }

    fn visit_pattern(&mut self, field: &FieldName, pattern: &str) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field.as_str(): regex(pattern.to_string()) })
    }
}

/// Builds a MongoDB sort document. Returns `None` for the store's default order.
pub(crate) fn sort_document(order: &OrderClause) -> Option<Document> {
    if order.is_empty() {
        return None;
    }

    Some(
        order
            .entries()
            .iter()
            .map(|entry| {
                let direction = match entry.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                (entry.field.as_str().to_string(), Bson::Int32(direction))
            })
            .collect()
    )
}
