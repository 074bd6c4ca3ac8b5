//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB restricts field names (document keys) from containing dots, dollar signs and
//! null bytes. Keys are rewritten on the way in and restored on the way out; values are
//! left untouched so stored data matches what queries compare against.

use bson::{Bson, Document};

/// Rewrites and restores document keys that MongoDB cannot store as-is.
pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Recursively sanitizes every key of a document, including nested documents and
    /// documents inside arrays.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::sanitize_key(&key), Self::map_value(value, Self::sanitize_document)))
            .collect()
    }

    /// Inverse of [`sanitize_document`](Self::sanitize_document).
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_key(&key), Self::map_value(value, Self::restore_document)))
            .collect()
    }

    pub(crate) fn sanitize_key(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    pub(crate) fn restore_key(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }

    fn map_value(value: Bson, on_document: fn(Document) -> Document) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(on_document(document)),
            Bson::Array(values) => Bson::Array(
                values
                    .into_iter()
                    .map(|value| Self::map_value(value, on_document))
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn keys_are_rewritten_and_restored() {
        let original = doc! {
            "_id": "x",
            "a.b": 1,
            "nested": { "$ref": "y" },
            "list": [{ "k.v": true }, "plain.text"],
        };

        let sanitized = KeySanitizer::sanitize_document(original.clone());

        assert_eq!(
            sanitized,
            doc! {
                "_id": "x",
                "a__dot__b": 1,
                "nested": { "__dollar__ref": "y" },
                "list": [{ "k__dot__v": true }, "plain.text"],
            }
        );
        assert_eq!(KeySanitizer::restore_document(sanitized), original);
    }

    #[test]
    fn string_values_are_not_touched() {
        let document = doc! { "email": "someone@example.com", "price": "$5" };

        assert_eq!(KeySanitizer::sanitize_document(document.clone()), document);
    }
}
