//! Entity module - Contains the record definitions mirrored from the hosted tables.
//!
//! Each entity is the `fields` object of one table. The record id and creation
//! time live in the surrounding [`Record`], exactly as the table service returns
//! them. Fields the service omits (empty cells) deserialize to their defaults.

pub mod announcement;
pub mod container;
pub mod invoice;
pub mod item;
pub mod support_request;
pub mod user;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

/// A record type stored in one hosted table.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name in the hosted base
    const TABLE: &'static str;
    /// Human-readable name used in error messages
    const NAME: &'static str;
}

/// A typed record as read back from the table service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    /// Service-assigned record id (`rec…`)
    pub id: String,
    /// When the service created the record
    pub created_time: Option<DateTime<Utc>>,
    /// The table's fields
    #[serde(flatten)]
    pub fields: T,
}

// Re-export specific types to keep call sites short
pub use announcement::{Announcement, AnnouncementType};
pub use container::{Container, ContainerStatus};
pub use invoice::{Invoice, InvoiceStatus};
pub use item::{Item, ItemStatus};
pub use support_request::{SupportCategory, SupportRequest, SupportStatus};
pub use user::{Profile, Role, User};
