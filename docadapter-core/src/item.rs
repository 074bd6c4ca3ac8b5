//! Item representation and conversion between the wire (JSON) and store (BSON) forms.
//!
//! Items are open-ended, insertion-ordered mappings. Inside the adapter they are held as
//! [`bson::Document`] so dates can be carried natively; at the wire boundary they are plain
//! JSON objects. The conversions here are deliberately literal: no extended-JSON keys are
//! interpreted, date handling belongs to [`crate::date::DateCodec`].

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::{
    date::DateCodec,
    error::{AdapterError, AdapterResult},
};

/// Name of the field that identifies an item within its collection.
pub const ID_FIELD: &str = "_id";

/// One record of a collection, as seen by executors.
pub type Item = Document;

/// One record of a collection, as seen by callers of the storage service.
pub type WireItem = Map<String, Value>;

/// Converts a JSON value into its BSON counterpart.
///
/// Integers are narrowed to `Int32` when they fit, unsigned values beyond `i64::MAX`
/// become doubles.
pub fn bson_from_json(value: Value) -> AdapterResult<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(value) => Bson::Boolean(value),
        Value::Number(number) => bson_from_number(&number)?,
        Value::String(value) => Bson::String(value),
        Value::Array(values) => Bson::Array(
            values
                .into_iter()
                .map(bson_from_json)
                .collect::<AdapterResult<Vec<_>>>()?
        ),
        Value::Object(map) => Bson::Document(item_from_json(map)?),
    })
}

fn bson_from_number(number: &Number) -> AdapterResult<Bson> {
    if let Some(value) = number.as_i64() {
        return Ok(match i32::try_from(value) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(value),
        });
    }

    number
        .as_f64()
        .map(Bson::Double)
        .ok_or_else(|| AdapterError::Serialization(format!("Unrepresentable number {number}")))
}

/// Converts a BSON value back into JSON.
///
/// Native dates that were not encoded beforehand are emitted in their tagged wrapper form,
/// so a date never leaks onto the wire as an opaque value.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(value) => Value::Bool(value),
        Bson::Int32(value) => Value::from(value),
        Bson::Int64(value) => Value::from(value),
        Bson::Double(value) => Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(value) => Value::String(value),
        Bson::Array(values) => Value::Array(
            values
                .into_iter()
                .map(bson_to_json)
                .collect()
        ),
        Bson::Document(doc) => Value::Object(item_to_json(doc)),
        Bson::DateTime(date) => bson_to_json(DateCodec::encode_value(Bson::DateTime(date))),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        other => Value::String(other.to_string()),
    }
}

/// Converts a wire item into an [`Item`], keeping field order.
pub fn item_from_json(map: WireItem) -> AdapterResult<Item> {
    let mut item = Item::new();

    for (key, value) in map {
        item.insert(key, bson_from_json(value)?);
    }

    Ok(item)
}

/// Converts an [`Item`] into its wire form, keeping field order.
pub fn item_to_json(item: Item) -> WireItem {
    item
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

/// Returns the identifier of an item, if it carries one.
///
/// A missing, null or empty `_id` counts as absent. Any non-string `_id` is rejected.
pub fn item_id(item: &Item) -> AdapterResult<Option<&str>> {
    match item.get(ID_FIELD) {
        None | Some(Bson::Null) => Ok(None),
        Some(Bson::String(id)) if id.is_empty() => Ok(None),
        Some(Bson::String(id)) => Ok(Some(id.as_str())),
        Some(_) => Err(AdapterError::BadRequest(format!(
            "Invalid {ID_FIELD} in item: expected a string"
        ))),
    }
}

/// Assigns a freshly generated identifier when the item has none, returning the identifier.
pub fn ensure_id(item: &mut Item) -> AdapterResult<String> {
    if let Some(id) = item_id(item)? {
        return Ok(id.to_string());
    }

    let id = Uuid::new_v4().to_string();
    item.insert(ID_FIELD, id.clone());

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    fn wire(value: Value) -> WireItem {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn json_items_keep_field_order() {
        let item = item_from_json(wire(json!({ "z": 1, "a": "x", "m": [true, null] }))).unwrap();

        let keys = item.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(item.get("z"), Some(&Bson::Int32(1)));
        assert_eq!(item.get("m"), Some(&Bson::Array(vec![Bson::Boolean(true), Bson::Null])));
    }

    #[test]
    fn large_and_fractional_numbers_survive() {
        let item = item_from_json(wire(json!({ "big": 1_i64 << 40, "pi": 3.5 }))).unwrap();

        assert_eq!(item.get("big"), Some(&Bson::Int64(1 << 40)));
        assert_eq!(item.get("pi"), Some(&Bson::Double(3.5)));
        assert_eq!(Value::Object(item_to_json(item)), json!({ "big": 1_i64 << 40, "pi": 3.5 }));
    }

    #[test]
    fn nested_objects_are_not_interpreted() {
        let item = item_from_json(wire(json!({ "meta": { "$date": "not a date" } }))).unwrap();

        assert_eq!(item.get_document("meta").unwrap(), &doc! { "$date": "not a date" });
    }

    #[test]
    fn ensure_id_generates_when_missing_or_empty() {
        let mut missing = doc! { "name": "a" };
        let mut empty = doc! { "_id": "", "name": "a" };

        let first = ensure_id(&mut missing).unwrap();
        let second = ensure_id(&mut empty).unwrap();

        assert!(!first.is_empty());
        assert_ne!(first, second);
        assert_eq!(missing.get_str(ID_FIELD).unwrap(), first);
    }

    #[test]
    fn ensure_id_keeps_existing_identifier() {
        let mut item = doc! { "_id": "abc" };

        assert_eq!(ensure_id(&mut item).unwrap(), "abc");
    }

    #[test]
    fn non_string_id_is_rejected() {
        let item = doc! { "_id": 42 };

        assert!(matches!(item_id(&item), Err(AdapterError::BadRequest(_))));
    }
}
