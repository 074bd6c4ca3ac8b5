//! Convenient re-exports of commonly used types from docadapter.
//!
//! ```ignore
//! use docadapter::prelude::*;
//! ```

pub use docadapter_core::{
    compile::FilterCompiler,
    date::DateCodec,
    envelope::{
        CountRequest, CountResponse, FindRequest, FindResponse, GetRequest, InsertRequest,
        ItemIdRequest, ItemRequest, ItemResponse, ListCollectionsResponse, RemoveRequest,
        RequestPayload, UpdateRequest,
    },
    error::{AdapterError, AdapterResult, ErrorKind},
    executor::{ExecutorBuilder, QueryExecutor},
    filter::{FieldName, FilterNode},
    item::{Item, WireItem},
    predicate::{Predicate, PredicateVisitor},
    service::StorageService,
    sort::{OrderClause, SortCompiler, SortDirection, SortSpec},
};

pub use crate::config::{AdapterConfig, BackendKind};
