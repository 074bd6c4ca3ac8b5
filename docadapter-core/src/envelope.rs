//! Request payloads and result envelopes of the storage operations.
//!
//! Every request field is optional at the type level: presence is checked by the storage
//! service so a missing field produces a [`BadRequest`](crate::error::AdapterError::BadRequest)
//! naming it, rather than a generic deserialization failure. Wire names are camelCase.
//!
//! # Example
//!
//! ```ignore
//! use docadapter_core::envelope::{FindRequest, RequestPayload};
//! use serde_json::json;
//!
//! let request = FindRequest::from_payload(json!({
//!     "collectionName": "widgets",
//!     "skip": 0,
//!     "limit": 10,
//! }))?;
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::{AdapterError, AdapterResult},
    item::WireItem,
};

/// Decoding of request payloads from raw JSON.
pub trait RequestPayload: DeserializeOwned {
    /// Decodes a payload, reporting shape errors as bad requests.
    fn from_payload(payload: Value) -> AdapterResult<Self> {
        serde_json::from_value(payload)
            .map_err(|err| AdapterError::BadRequest(format!("Malformed request body: {err}")))
    }
}

/// Payload of `find`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Filter tree in wire form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Sort specification in wire form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    /// Number of records to skip. Zero is a valid value, absence is not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    /// Maximum number of records to return; must be positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl FindRequest {
    pub fn new(collection_name: impl Into<String>, skip: i64, limit: i64) -> Self {
        Self {
            collection_name: Some(collection_name.into()),
            skip: Some(skip),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Sets the filter tree.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the sort specification.
    pub fn with_sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl RequestPayload for FindRequest {}

/// Payload of `get` and `remove`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemIdRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl ItemIdRequest {
    pub fn new(collection_name: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            collection_name: Some(collection_name.into()),
            item_id: Some(item_id.into()),
        }
    }
}

impl RequestPayload for ItemIdRequest {}

/// Payload of `get`.
pub type GetRequest = ItemIdRequest;

/// Payload of `remove`.
pub type RemoveRequest = ItemIdRequest;

/// Payload of `insert` and `update`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<WireItem>,
}

impl ItemRequest {
    pub fn new(collection_name: impl Into<String>, item: WireItem) -> Self {
        Self {
            collection_name: Some(collection_name.into()),
            item: Some(item),
        }
    }
}

impl RequestPayload for ItemRequest {}

/// Payload of `insert`.
pub type InsertRequest = ItemRequest;

/// Payload of `update`.
pub type UpdateRequest = ItemRequest;

/// Payload of `count`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl CountRequest {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: Some(collection_name.into()),
            filter: None,
        }
    }

    /// Sets the filter tree.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl RequestPayload for CountRequest {}

/// Result of `find`: one page of items plus the size of the whole matching population.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindResponse {
    pub items: Vec<WireItem>,
    /// Number of matching records, independent of `skip` and `limit`.
    pub total_count: u64,
}

/// Result of `get`, `insert`, `update` and `remove`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemResponse {
    pub item: WireItem,
}

/// Result of `count`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub total_count: u64,
}

/// Result of `list_collections`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListCollectionsResponse {
    pub collections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_payload_distinguishes_zero_from_absent() {
        let zero = FindRequest::from_payload(json!({ "collectionName": "w", "skip": 0, "limit": 5 })).unwrap();
        let absent = FindRequest::from_payload(json!({ "collectionName": "w", "limit": 5 })).unwrap();

        assert_eq!(zero.skip, Some(0));
        assert_eq!(absent.skip, None);
    }

    #[test]
    fn malformed_payloads_are_bad_requests() {
        let result = FindRequest::from_payload(json!({ "collectionName": 12 }));

        assert!(matches!(result, Err(AdapterError::BadRequest(_))));
    }

    #[test]
    fn responses_use_camel_case() {
        let response = FindResponse { items: vec![], total_count: 3 };

        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "items": [], "totalCount": 3 }));
        assert_eq!(
            serde_json::to_value(CountResponse { total_count: 7 }).unwrap(),
            json!({ "totalCount": 7 })
        );
    }

    #[test]
    fn builders_fill_the_payload() {
        let request = FindRequest::new("widgets", 0, 10)
            .with_filter(json!({ "operator": "$eq", "fieldName": "a", "value": 1 }));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "collectionName": "widgets",
                "filter": { "operator": "$eq", "fieldName": "a", "value": 1 },
                "skip": 0,
                "limit": 10,
            })
        );
    }
}
