//! Hosted table service REST client.
//!
//! Every call is a direct pass-through to the documented REST API: one request
//! per operation, no retries. Listing follows the `offset` cursor until the
//! service stops returning one.

use super::{Fields, ListQuery, RawRecord, RecordStore};
use crate::{
    config::Secret,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error};

const API_ROOT: &str = "https://api.airtable.com/v0";
const PAGE_SIZE: usize = 100;

/// One page of a list response
#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    records: Vec<RawRecord>,
    offset: Option<String>,
}

/// [`RecordStore`] backed by the hosted table service.
#[derive(Clone)]
pub struct AirtableStore {
    client: Client,
    api_root: String,
    base_id: String,
    api_key: Secret,
}

impl AirtableStore {
    /// Creates a client for one base.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: Secret, base_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_root: API_ROOT.to_string(),
            base_id: base_id.into(),
            api_key,
        })
    }

    /// Points the client at a different API root, e.g. a local proxy.
    #[must_use]
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.api_root, self.base_id, table)
    }

    fn record_url(&self, table: &str, id: &str) -> String {
        format!("{}/{}", self.table_url(table), id)
    }

    /// Turns a non-success response into `Error::TableService`.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = service_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
        error!(status = status.as_u16(), %message, "Table service request failed");
        Err(Error::TableService {
            status: status.as_u16(),
            message,
        })
    }
}

/// Extracts the human-readable message from a service error body.
///
/// The service answers either `{"error": {"type": .., "message": ..}}` or
/// `{"error": "TYPE"}`.
fn service_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(kind) => Some(kind.clone()),
        Value::Object(detail) => detail
            .get("message")
            .or_else(|| detail.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(filter) = &query.filter {
                params.push(("filterByFormula", filter.to_formula()));
            }
            if let Some(max) = query.max_records {
                params.push(("maxRecords", max.to_string()));
            }
            if let Some(cursor) = &offset {
                params.push(("offset", cursor.clone()));
            }

            let response = self
                .client
                .get(self.table_url(table))
                .bearer_auth(self.api_key.expose())
                .query(&params)
                .send()
                .await?;
            let page: ListPage = Self::check(response).await?.json().await?;
            debug!(table, fetched = page.records.len(), "Fetched page");
            records.extend(page.records);

            match page.offset {
                Some(next) if query.max_records.is_none_or(|max| records.len() < max) => {
                    offset = Some(next);
                }
                _ => break,
            }
        }

        if let Some(max) = query.max_records {
            records.truncate(max);
        }
        Ok(records)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<RawRecord>> {
        let response = self
            .client
            .get(self.record_url(table, id))
            .bearer_auth(self.api_key.expose())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = Self::check(response).await?.json().await?;
        Ok(Some(record))
    }

    async fn create(&self, table: &str, fields: Fields) -> Result<RawRecord> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(self.api_key.expose())
            .json(&json!({ "fields": fields, "typecast": true }))
            .send()
            .await?;
        let record: RawRecord = Self::check(response).await?.json().await?;
        debug!(table, id = %record.id, "Created record");
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<RawRecord> {
        let response = self
            .client
            .patch(self.record_url(table, id))
            .bearer_auth(self.api_key.expose())
            .json(&json!({ "fields": fields, "typecast": true }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                entity: "Record",
                id: id.to_string(),
            });
        }
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.record_url(table, id))
            .bearer_auth(self.api_key.expose())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                entity: "Record",
                id: id.to_string(),
            });
        }
        Self::check(response).await?;
        debug!(table, id, "Deleted record");
        Ok(())
    }
}
