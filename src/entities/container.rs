//! Container entity - A shipping consolidation unit.
//!
//! Items reference their container by record id.

use super::Entity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContainerStatus {
    /// Being filled at the China warehouse
    #[default]
    Loading,
    /// Departed China
    Shipped,
    /// Landed at the Ghana port
    Arrived,
    /// Released by customs
    Cleared,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loading => "Loading",
            Self::Shipped => "Shipped",
            Self::Arrived => "Arrived",
            Self::Cleared => "Cleared",
        };
        f.write_str(label)
    }
}

/// Fields of a `Containers` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    /// Shipping line container number
    pub container_number: String,
    /// Lifecycle position
    pub status: ContainerStatus,
    /// Departure from China
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<NaiveDate>,
    /// Expected or actual arrival in Ghana
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<NaiveDate>,
    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for Container {
    const TABLE: &'static str = "Containers";
    const NAME: &'static str = "Container";
}
