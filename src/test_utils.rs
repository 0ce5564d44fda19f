//! Shared test utilities for `ShipLink`.
//!
//! This module provides an in-memory record store, stand-ins for the email and
//! photo services, and helpers for creating test records with sensible defaults.

use crate::{
    core::{Actor, accounts, today},
    entities::{Container, ContainerStatus, Item, ItemStatus, Record, Role, User},
    errors::Result,
    services::{
        images::{PhotoHost, UploadedImage, validate_upload},
        mail::{EmailMessage, MailTransport, Mailer},
    },
    store::{MemoryStore, Records},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

/// Login URL passed to account operations in tests.
pub const TEST_LOGIN_URL: &str = "http://localhost:8080/login";

/// Password of every user created by these helpers.
pub const TEST_PASSWORD: &str = "test-password-1";

// Hashing is slow on purpose; hash the shared password once per test binary
static TEST_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| accounts::hash_password(TEST_PASSWORD).unwrap_or_default());

/// Creates an empty in-memory store. The store handle is returned as well so
/// tests can inspect tables or inject failures.
pub fn setup_records() -> (Arc<MemoryStore>, Records) {
    let store = Arc::new(MemoryStore::new());
    let records = Records::new(store.clone());
    (store, records)
}

/// Mail transport that keeps every message it is given.
#[derive(Default)]
pub struct RecordingTransport {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl RecordingTransport {
    /// Messages sent so far, oldest first.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.outbox.lock().await.push(message.clone());
        Ok(())
    }
}

/// A mailer whose messages land in the returned transport.
pub fn recording_mailer() -> (Mailer, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    (Mailer::with_transport(transport.clone()), transport)
}

/// Photo host that hands out predictable URLs: `https://images.test/{n}/{file}`
/// where `n` counts uploads from 1.
#[derive(Default)]
pub struct FakePhotoHost {
    uploads: Mutex<Vec<String>>,
}

impl FakePhotoHost {
    /// Number of accepted uploads.
    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl PhotoHost for FakePhotoHost {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage> {
        validate_upload(content_type, bytes.len())?;
        let mut uploads = self.uploads.lock().await;
        uploads.push(file_name.to_string());
        let n = uploads.len();
        Ok(UploadedImage {
            url: format!("https://images.test/{n}/{file_name}"),
            public_id: format!("shiplink/{n}"),
        })
    }
}

async fn insert_user(records: &Records, name: &str, email: &str, role: Role) -> Result<Record<User>> {
    records
        .insert(&User {
            name: name.to_string(),
            email: email.to_string(),
            role,
            password_hash: TEST_PASSWORD_HASH.clone(),
            active: true,
            created_at: Some(Utc::now()),
            ..User::default()
        })
        .await
}

/// Inserts an admin user and returns it as an actor.
pub async fn test_admin(records: &Records) -> Result<Actor> {
    let user = insert_user(records, "Test Admin", "admin@shiplink.test", Role::Admin).await?;
    Ok(Actor::from_record(&user))
}

/// Inserts a warehouse team member and returns it as an actor.
pub async fn test_team_member(records: &Records) -> Result<Actor> {
    let user = insert_user(records, "Test Team", "team@shiplink.test", Role::Team).await?;
    Ok(Actor::from_record(&user))
}

/// Creates an active customer whose password is [`TEST_PASSWORD`].
pub async fn create_test_customer(records: &Records, name: &str, email: &str) -> Result<Record<User>> {
    insert_user(records, name, email, Role::Customer).await
}

/// Creates an item for a customer, stored directly with the given status.
///
/// # Defaults
/// * 60 x 50 x 40 cm, quantity 1 (0.12 CBM)
/// * `cost_usd`: 30.0, `cost_ghs`: 465.0
/// * `weight_kg`: 5.0
/// * received today, no carton or container
pub async fn create_test_item(
    records: &Records,
    customer_id: &str,
    status: ItemStatus,
) -> Result<Record<Item>> {
    let count = records.all::<Item>().await?.len();
    records
        .insert(&Item {
            tracking_number: format!("SLTEST{:06}", count + 1),
            customer_id: customer_id.to_string(),
            description: "Phone accessories".to_string(),
            quantity: 1,
            length_cm: 60.0,
            width_cm: 50.0,
            height_cm: 40.0,
            weight_kg: 5.0,
            cbm: 0.12,
            cost_usd: 30.0,
            cost_ghs: 465.0,
            status,
            received_at: Some(today()),
            ..Item::default()
        })
        .await
}

/// Creates a container in the Loading state.
pub async fn create_test_container(records: &Records, number: &str) -> Result<Record<Container>> {
    records
        .insert(&Container {
            container_number: number.to_string(),
            status: ContainerStatus::Loading,
            ..Container::default()
        })
        .await
}
