//! Record store - the data-access wrapper over the hosted table service.
//!
//! [`RecordStore`] is the raw CRUD seam: JSON field maps in, JSON field maps out.
//! [`AirtableStore`] talks to the hosted service and [`MemoryStore`] keeps
//! records in-process for tests and demos. Business logic goes through the
//! typed [`Records`] facade instead of using a store directly.

/// Hosted table service REST client
pub mod airtable;
/// In-process store
pub mod memory;
/// Typed access on top of a raw store
pub mod records;

pub use airtable::AirtableStore;
pub use memory::MemoryStore;
pub use records::Records;

use crate::{
    entities::Record,
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Field map of a record.
pub type Fields = serde_json::Map<String, Value>;

/// An untyped record exactly as the store returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Record id
    pub id: String,
    /// Creation timestamp assigned by the store
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    /// Field values; empty cells are absent
    #[serde(default)]
    pub fields: Fields,
}

impl RawRecord {
    /// Deserializes the field map into an entity.
    ///
    /// # Errors
    /// Returns an error if a field has an unexpected type or enum value.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Record<T>> {
        let fields = serde_json::from_value(Value::Object(self.fields))?;
        Ok(Record {
            id: self.id,
            created_time: self.created_time,
            fields,
        })
    }
}

/// What a [`FieldFilter`] tests for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The cell equals this text
    Equals(String),
    /// The checkbox cell is ticked
    Checked,
}

/// Condition on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    /// Field name
    pub field: String,
    /// What the field must hold
    pub condition: Condition,
}

impl FieldFilter {
    /// Builds a `field = value` condition.
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Equals(value.into()),
        }
    }

    /// Builds a condition on a ticked checkbox.
    ///
    /// Checkboxes evaluate to 1 or 0 in formulas, so a text comparison against
    /// `'true'` never matches them.
    pub fn checked(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Checked,
        }
    }

    /// Renders the condition as a table-service formula.
    ///
    /// String literals are single-quoted with backslashes and quotes escaped.
    #[must_use]
    pub fn to_formula(&self) -> String {
        let field = self.field.replace('}', "\\}");
        match &self.condition {
            Condition::Equals(value) => {
                let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
                format!("{{{field}}} = '{escaped}'")
            }
            Condition::Checked => format!("{{{field}}} = TRUE()"),
        }
    }

    /// Evaluates the condition against a field map the way the service does:
    /// values compare as text, a missing cell equals the empty string and a
    /// checkbox only matches [`Condition::Checked`].
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        let cell = fields.get(&self.field);
        let value = match &self.condition {
            Condition::Checked => return matches!(cell, Some(Value::Bool(true))),
            Condition::Equals(value) => value,
        };
        match cell {
            None | Some(Value::Null) => value.is_empty(),
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => n.to_string() == *value,
            Some(Value::Array(values)) => values
                .iter()
                .any(|v| v.as_str().is_some_and(|s| s == value)),
            Some(Value::Bool(_) | Value::Object(_)) => false,
        }
    }
}

/// Options for listing a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only return records matching this condition
    pub filter: Option<FieldFilter>,
    /// Stop after this many records
    pub max_records: Option<usize>,
}

impl ListQuery {
    /// Lists every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Lists records where `field` equals `value`.
    pub fn where_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            filter: Some(FieldFilter::equals(field, value)),
            max_records: None,
        }
    }

    /// Lists records whose checkbox `field` is ticked.
    pub fn where_checked(field: impl Into<String>) -> Self {
        Self {
            filter: Some(FieldFilter::checked(field)),
            max_records: None,
        }
    }

    /// Caps the number of returned records.
    #[must_use]
    pub const fn limit(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }
}

/// Raw CRUD over named tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists records of a table, following pagination to the end.
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<RawRecord>>;

    /// Fetches one record, `None` if the id does not exist.
    async fn get(&self, table: &str, id: &str) -> Result<Option<RawRecord>>;

    /// Creates a record from a field map.
    async fn create(&self, table: &str, fields: Fields) -> Result<RawRecord>;

    /// Partially updates a record; `null` values clear a field.
    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<RawRecord>;

    /// Deletes a record.
    async fn delete(&self, table: &str, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[test]
    fn test_formula_escapes_quotes_and_backslashes() {
        let filter = FieldFilter::equals("email", r"o'neil\x@example.com");
        assert_eq!(
            filter.to_formula(),
            r"{email} = 'o\'neil\\x@example.com'"
        );
    }

    #[test]
    fn test_checkbox_formula() {
        assert_eq!(FieldFilter::checked("active").to_formula(), "{active} = TRUE()");
        assert_eq!(
            ListQuery::where_checked("active").filter,
            Some(FieldFilter::checked("active"))
        );
    }

    #[test]
    fn test_filter_matches_like_the_service() {
        let record = fields(json!({
            "email": "ama@example.com",
            "quantity": 3,
            "active": true,
            "itemIds": ["rec1", "rec2"]
        }));
        assert!(FieldFilter::equals("email", "ama@example.com").matches(&record));
        assert!(!FieldFilter::equals("email", "AMA@example.com").matches(&record));
        assert!(FieldFilter::equals("quantity", "3").matches(&record));
        assert!(FieldFilter::checked("active").matches(&record));
        assert!(!FieldFilter::equals("active", "true").matches(&record));
        assert!(!FieldFilter::checked("archived").matches(&record));
        assert!(FieldFilter::equals("itemIds", "rec2").matches(&record));
        assert!(FieldFilter::equals("notes", "").matches(&record));
        assert!(!FieldFilter::equals("notes", "x").matches(&record));
    }

    #[test]
    fn test_raw_record_into_typed() -> Result<()> {
        let raw: RawRecord = serde_json::from_value(json!({
            "id": "recA",
            "createdTime": "2024-05-01T10:00:00.000Z",
            "fields": { "title": "Port closed", "type": "Warning", "active": true }
        }))?;
        let typed = raw.into_typed::<crate::entities::Announcement>()?;
        assert_eq!(typed.id, "recA");
        assert!(typed.created_time.is_some());
        assert_eq!(typed.fields.kind, crate::entities::AnnouncementType::Warning);
        Ok(())
    }
}
