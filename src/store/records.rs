//! Typed access to the record store.
//!
//! [`Records`] is what the rest of the crate holds. It resolves the table from
//! the entity type and converts between entity structs and raw field maps.

use super::{Fields, ListQuery, RecordStore};
use crate::{
    entities::{Entity, Record},
    errors::{Error, Result},
};
use serde_json::Value;
use std::sync::Arc;

/// Cloneable handle for typed record CRUD.
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn RecordStore>,
}

impl Records {
    /// Wraps a raw store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Every record of the entity's table.
    ///
    /// # Errors
    /// Returns an error if the store call fails or a record does not match the entity.
    pub async fn all<T: Entity>(&self) -> Result<Vec<Record<T>>> {
        self.query(&ListQuery::all()).await
    }

    /// Records matching a list query.
    ///
    /// # Errors
    /// Returns an error if the store call fails or a record does not match the entity.
    pub async fn query<T: Entity>(&self, query: &ListQuery) -> Result<Vec<Record<T>>> {
        self.store
            .list(T::TABLE, query)
            .await?
            .into_iter()
            .map(super::RawRecord::into_typed)
            .collect()
    }

    /// Records where `field` equals `value`.
    ///
    /// # Errors
    /// Returns an error if the store call fails or a record does not match the entity.
    pub async fn find_by<T: Entity>(&self, field: &str, value: &str) -> Result<Vec<Record<T>>> {
        self.query(&ListQuery::where_eq(field, value)).await
    }

    /// Records whose checkbox `field` is ticked.
    ///
    /// # Errors
    /// Returns an error if the store call fails or a record does not match the entity.
    pub async fn find_checked<T: Entity>(&self, field: &str) -> Result<Vec<Record<T>>> {
        self.query(&ListQuery::where_checked(field)).await
    }

    /// One record by id, `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the store call fails or the record does not match the entity.
    pub async fn find<T: Entity>(&self, id: &str) -> Result<Option<Record<T>>> {
        self.store
            .get(T::TABLE, id)
            .await?
            .map(super::RawRecord::into_typed)
            .transpose()
    }

    /// One record by id.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the id does not exist.
    pub async fn get<T: Entity>(&self, id: &str) -> Result<Record<T>> {
        self.find(id).await?.ok_or_else(|| Error::NotFound {
            entity: T::NAME,
            id: id.to_string(),
        })
    }

    /// Creates a record from an entity.
    ///
    /// # Errors
    /// Returns an error if the store rejects the record.
    pub async fn insert<T: Entity>(&self, fields: &T) -> Result<Record<T>> {
        let map = to_fields(serde_json::to_value(fields)?)?;
        self.store.create(T::TABLE, map).await?.into_typed()
    }

    /// Applies a partial update given as a JSON object.
    ///
    /// # Errors
    /// Returns an error if `changes` is not an object or the store rejects the update.
    pub async fn patch<T: Entity>(&self, id: &str, changes: Value) -> Result<Record<T>> {
        let map = to_fields(changes)?;
        self.store
            .update(T::TABLE, id, map)
            .await
            .map_err(|e| match e {
                Error::NotFound { id, .. } => Error::NotFound {
                    entity: T::NAME,
                    id,
                },
                other => other,
            })?
            .into_typed()
    }

    /// Deletes a record.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the id does not exist.
    pub async fn remove<T: Entity>(&self, id: &str) -> Result<()> {
        self.store.delete(T::TABLE, id).await.map_err(|e| match e {
            Error::NotFound { id, .. } => Error::NotFound {
                entity: T::NAME,
                id,
            },
            other => other,
        })
    }
}

fn to_fields(value: Value) -> Result<Fields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::validation(format!(
            "Record fields must be a JSON object, got {other}"
        ))),
    }
}
