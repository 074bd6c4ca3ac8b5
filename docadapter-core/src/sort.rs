//! Sort specifications and their compiled ordering clauses.
//!
//! The wire form is an ordered list of `{ "fieldName": "...", "direction": "asc" | "desc" }`
//! entries; the direction defaults to ascending. Field names go through the same allow-list
//! as filter field names.

use std::fmt;

use serde_json::Value;

use crate::{
    error::{AdapterError, AdapterResult},
    filter::FieldName,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortEntry {
    /// The field name to sort by.
    pub field: FieldName,
    /// The sort direction.
    pub direction: SortDirection,
}

/// An ordered list of sort keys, as requested by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(pub Vec<SortEntry>);

impl SortSpec {
    /// Parses a sort specification from its wire form. Absent or `null` is the empty spec.
    pub fn from_json(sort: Option<&Value>) -> AdapterResult<Self> {
        let entries = match sort {
            None | Some(Value::Null) => return Ok(SortSpec::default()),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(AdapterError::BadRequest("Sort must be a list".into())),
        };

        entries
            .iter()
            .map(Self::parse_entry)
            .collect::<AdapterResult<Vec<_>>>()
            .map(SortSpec)
    }

    fn parse_entry(entry: &Value) -> AdapterResult<SortEntry> {
        let field = match entry.get("fieldName") {
            Some(Value::String(name)) => FieldName::parse(name)?,
            _ => return Err(AdapterError::BadRequest("Missing fieldName in sort".into())),
        };
        let direction = match entry.get("direction") {
            None | Some(Value::Null) => SortDirection::Asc,
            Some(Value::String(direction)) if direction.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(Value::String(direction)) if direction.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(AdapterError::BadRequest(format!("Invalid sort direction {other}")));
            }
        };

        Ok(SortEntry { field, direction })
    }
}

/// A compiled ordering. Empty means the store's default order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderClause(Vec<SortEntry>);

impl OrderClause {
    pub fn entries(&self) -> &[SortEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", entry.field, entry.direction.as_sql())?;
        }

        Ok(())
    }
}

pub struct SortCompiler;

impl SortCompiler {
    /// Compiles a sort specification. A field listed twice keeps its first direction.
    pub fn compile(spec: &SortSpec) -> OrderClause {
        let mut entries: Vec<SortEntry> = Vec::with_capacity(spec.0.len());

        for entry in &spec.0 {
            if !entries.iter().any(|seen| seen.field == entry.field) {
                entries.push(entry.clone());
            }
        }

        OrderClause(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiled(sort: Value) -> String {
        SortCompiler::compile(&SortSpec::from_json(Some(&sort)).unwrap()).to_string()
    }

    #[test]
    fn empty_spec_is_store_default() {
        assert!(SortCompiler::compile(&SortSpec::from_json(None).unwrap()).is_empty());
        assert_eq!(compiled(json!([])), "");
        assert_eq!(compiled(json!(null)), "");
    }

    #[test]
    fn entries_keep_their_order() {
        let sort = json!([
            { "fieldName": "lastName", "direction": "desc" },
            { "fieldName": "firstName" },
            { "fieldName": "age", "direction": "ASC" },
        ]);

        assert_eq!(compiled(sort), "lastName DESC, firstName ASC, age ASC");
    }

    #[test]
    fn repeated_fields_keep_the_first_direction() {
        let sort = json!([
            { "fieldName": "a", "direction": "desc" },
            { "fieldName": "a", "direction": "asc" },
        ]);

        assert_eq!(compiled(sort), "a DESC");
    }

    #[test]
    fn structural_injection_is_rejected() {
        for name in ["a; DROP TABLE x", "a DESC, b", "$natural", "a.b"] {
            let sort = json!([{ "fieldName": name }]);

            assert!(matches!(SortSpec::from_json(Some(&sort)), Err(AdapterError::BadRequest(_))));
        }
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let sort = json!([{ "fieldName": "a", "direction": "sideways" }]);

        assert!(matches!(SortSpec::from_json(Some(&sort)), Err(AdapterError::BadRequest(_))));
    }
}
