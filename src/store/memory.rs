//! In-process record store.
//!
//! Mirrors the hosted service's observable behavior closely enough for tests
//! and local demos: generated `rec…` ids, creation timestamps, insertion-order
//! listing, text-based filters and `null` clearing a field on update.

use super::{Fields, ListQuery, RawRecord, RecordStore};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A failure to return from the next write, for exercising error paths.
#[derive(Debug, Clone)]
struct InjectedFailure {
    status: u16,
    message: String,
}

/// [`RecordStore`] that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<RawRecord>>>,
    next_write_failure: RwLock<Option<InjectedFailure>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next create/update/delete fail with a table service error.
    pub async fn fail_next_write(&self, status: u16, message: impl Into<String>) {
        *self.next_write_failure.write().await = Some(InjectedFailure {
            status,
            message: message.into(),
        });
    }

    /// Number of records currently in a table.
    pub async fn count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    async fn take_failure(&self) -> Result<()> {
        match self.next_write_failure.write().await.take() {
            Some(failure) => Err(Error::TableService {
                status: failure.status,
                message: failure.message,
            }),
            None => Ok(()),
        }
    }
}

fn new_record_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("rec{}", &hex[..14])
}

/// Drops `null` values, which the service treats as empty cells.
fn strip_nulls(fields: Fields) -> Fields {
    fields.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<RawRecord>> {
        let tables = self.tables.read().await;
        let records = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        let matching = records
            .iter()
            .filter(|r| query.filter.as_ref().is_none_or(|f| f.matches(&r.fields)))
            .take(query.max_records.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<RawRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn create(&self, table: &str, fields: Fields) -> Result<RawRecord> {
        self.take_failure().await?;
        let record = RawRecord {
            id: new_record_id(),
            created_time: Some(Utc::now()),
            fields: strip_nulls(fields),
        };
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<RawRecord> {
        self.take_failure().await?;
        let mut tables = self.tables.write().await;
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| Error::NotFound {
                entity: "Record",
                id: id.to_string(),
            })?;
        for (key, value) in fields {
            if value == Value::Null {
                record.fields.remove(&key);
            } else {
                record.fields.insert(key, value);
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.take_failure().await?;
        let mut tables = self.tables.write().await;
        let records = tables.get_mut(table).ok_or_else(|| Error::NotFound {
            entity: "Record",
            id: id.to_string(),
        })?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(Error::NotFound {
                entity: "Record",
                id: id.to_string(),
            });
        }
        Ok(())
    }
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

    #[tokio::test]
    async fn test_create_list_and_filter() -> Result<()> {
        let store = MemoryStore::new();
        store
            .create("Users", fields(json!({"email": "a@x.com", "role": "admin"})))
            .await?;
        store
            .create("Users", fields(json!({"email": "b@x.com", "role": "customer"})))
            .await?;
        store
            .create("Users", fields(json!({"email": "c@x.com", "role": "customer"})))
            .await?;

        let all = store.list("Users", &ListQuery::all()).await?;
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.id.starts_with("rec") && r.id.len() == 17));

        let customers = store
            .list("Users", &ListQuery::where_eq("role", "customer"))
            .await?;
        assert_eq!(customers.len(), 2);

        let limited = store
            .list("Users", &ListQuery::where_eq("role", "customer").limit(1))
            .await?;
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].fields["email"], "b@x.com");

        assert!(store.list("Nope", &ListQuery::all()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_merges_and_null_clears() -> Result<()> {
        let store = MemoryStore::new();
        let created = store
            .create(
                "Items",
                fields(json!({"status": "Received", "cartonNumber": "C-1", "notes": null})),
            )
            .await?;
        assert!(!created.fields.contains_key("notes"));

        let updated = store
            .update(
                "Items",
                &created.id,
                fields(json!({"status": "Packed", "cartonNumber": null})),
            )
            .await?;
        assert_eq!(updated.fields["status"], "Packed");
        assert!(!updated.fields.contains_key("cartonNumber"));

        let missing = store.update("Items", "recMissing", Fields::new()).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_get() -> Result<()> {
        let store = MemoryStore::new();
        let created = store.create("Containers", Fields::new()).await?;
        assert!(store.get("Containers", &created.id).await?.is_some());

        store.delete("Containers", &created.id).await?;
        assert!(store.get("Containers", &created.id).await?.is_none());
        assert!(store.delete("Containers", &created.id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() -> Result<()> {
        let store = MemoryStore::new();
        store.fail_next_write(422, "Duplicate email").await;

        let failed = store.create("Users", Fields::new()).await;
        assert!(matches!(failed, Err(Error::TableService { status: 422, .. })));
        assert_eq!(store.count("Users").await, 0);

        store.create("Users", Fields::new()).await?;
        assert_eq!(store.count("Users").await, 1);
        Ok(())
    }
}
