//! Conversion between native dates and their tagged wire representation.
//!
//! On the wire a date travels as a single-key wrapper object, `{ "date": "<ISO-8601>" }`.
//! Inside the adapter it is a [`bson::DateTime`]. Inbound, bare strings that look like an
//! ISO-8601 date-time are promoted to native dates as well, and the legacy `$date` key is
//! accepted in place of `date`.

use std::sync::OnceLock;

use bson::{Bson, DateTime, doc};
use chrono::{NaiveDateTime, Utc};
use regex::Regex;

use crate::item::{ID_FIELD, Item};

/// Key of the tagged date wrapper emitted on the wire.
pub const DATE_TAG: &str = "date";

/// Extended-JSON spelling of the wrapper key, accepted inbound only.
pub const LEGACY_DATE_TAG: &str = "$date";

const ISO_PATTERN: &str =
    r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2}(?:\.\d*))(?:Z|(\+|-)([\d|:]*))?$";

/// Outbound rendering: UTC, millisecond precision, no offset suffix.
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

fn iso_regex() -> &'static Regex {
    static ISO_REGEX: OnceLock<Regex> = OnceLock::new();
    ISO_REGEX.get_or_init(|| Regex::new(ISO_PATTERN).expect("ISO pattern is valid"))
}

/// Returns `true` when the string matches the ISO-8601 date-time grammar used for promotion.
pub fn is_iso_datetime(value: &str) -> bool {
    iso_regex().is_match(value)
}

/// Parses an ISO-8601 date-time into a native date.
///
/// Strings without an offset are read as UTC. Returns `None` for anything that does not
/// match the grammar or names an impossible instant.
pub fn parse_iso(value: &str) -> Option<DateTime> {
    if !is_iso_datetime(value) {
        return None;
    }

    let millis = match chrono::DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => parsed.timestamp_millis(),
        Err(_) => match chrono::DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
            Ok(parsed) => parsed.timestamp_millis(),
            Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()?
                .and_utc()
                .timestamp_millis(),
        },
    };

    Some(DateTime::from_millis(millis))
}

/// Renders a native date in the wire format.
pub fn format_wire(date: DateTime) -> String {
    match chrono::DateTime::<Utc>::from_timestamp_millis(date.timestamp_millis()) {
        Some(date) => date.format(WIRE_FORMAT).to_string(),
        None => date.to_string(),
    }
}

/// Bidirectional date codec applied to items at the wire boundary.
///
/// Both directions look at top-level fields only, keep field order, and are inverses of each
/// other for items made of non-date values and well-formed dates.
pub struct DateCodec;

impl DateCodec {
    /// Replaces tagged wrappers and ISO-looking strings with native dates.
    ///
    /// The `_id` field is never promoted: identifiers stay strings whatever they look like.
    pub fn decode_inbound(item: Item) -> Item {
        item
            .into_iter()
            .map(|(key, value)| {
                let value = if key == ID_FIELD { value } else { Self::decode_value(value) };
                (key, value)
            })
            .collect()
    }

    /// Replaces native dates with their tagged wrapper form.
    pub fn encode_outbound(item: Item) -> Item {
        item
            .into_iter()
            .map(|(key, value)| (key, Self::encode_value(value)))
            .collect()
    }

    /// Maps a single value to a native date when it is a wrapper or an ISO string.
    ///
    /// Wrappers whose payload cannot be read as a date are returned unchanged.
    pub fn decode_value(value: Bson) -> Bson {
        match value {
            Bson::String(text) => match parse_iso(&text) {
                Some(date) => Bson::DateTime(date),
                None => Bson::String(text),
            },
            Bson::Document(wrapper) => match Self::unwrap_date(&wrapper) {
                Some(date) => Bson::DateTime(date),
                None => Bson::Document(wrapper),
            },
            other => other,
        }
    }

    /// Maps a native date to its wrapper; every other value passes through.
    pub fn encode_value(value: Bson) -> Bson {
        match value {
            Bson::DateTime(date) => Bson::Document(doc! { DATE_TAG: format_wire(date) }),
            other => other,
        }
    }

    fn unwrap_date(wrapper: &bson::Document) -> Option<DateTime> {
        if wrapper.len() != 1 {
            return None;
        }

        let payload = wrapper
            .get(DATE_TAG)
            .or_else(|| wrapper.get(LEGACY_DATE_TAG))?;

        match payload {
            Bson::String(text) => parse_iso(text),
            Bson::Int64(millis) => Some(DateTime::from_millis(*millis)),
            Bson::Int32(millis) => Some(DateTime::from_millis(i64::from(*millis))),
            Bson::DateTime(date) => Some(*date),
            _ => None,
        }
    }
}
