//! Item entity - A customer parcel moving through the shipping pipeline.
//!
//! Items are received at the China warehouse, packed into cartons, loaded into
//! a container, shipped, and released to the customer in Ghana. Volume and
//! cost are stored on the record when the item is created or re-measured.

use super::Entity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an item in the fixed China-to-Ghana pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Checked in at the China warehouse
    #[default]
    Received,
    /// Packed into a carton
    Packed,
    /// Loaded into a container
    Loaded,
    /// On the water
    #[serde(rename = "In Transit")]
    InTransit,
    /// Landed in Ghana
    Arrived,
    /// Cleared and waiting for the customer
    #[serde(rename = "Ready for Pickup")]
    ReadyForPickup,
    /// Handed over to the customer
    Delivered,
}

impl ItemStatus {
    /// Every status, in pipeline order.
    pub const ALL: [Self; 7] = [
        Self::Received,
        Self::Packed,
        Self::Loaded,
        Self::InTransit,
        Self::Arrived,
        Self::ReadyForPickup,
        Self::Delivered,
    ];

    /// Statuses the China-side warehouse team is responsible for.
    #[must_use]
    pub const fn is_china_side(self) -> bool {
        matches!(self, Self::Received | Self::Packed | Self::Loaded)
    }

    /// Label as stored in the table service.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Packed => "Packed",
            Self::Loaded => "Loaded",
            Self::InTransit => "In Transit",
            Self::Arrived => "Arrived",
            Self::ReadyForPickup => "Ready for Pickup",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields of an `Items` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    /// Customer-facing tracking number
    pub tracking_number: String,
    /// Owning customer's `Users` record id
    pub customer_id: String,
    /// What is in the parcel
    pub description: String,
    /// Number of identical packages
    pub quantity: u32,
    /// Package length in centimeters
    pub length_cm: f64,
    /// Package width in centimeters
    pub width_cm: f64,
    /// Package height in centimeters
    pub height_cm: f64,
    /// Gross weight in kilograms
    pub weight_kg: f64,
    /// Total volume in cubic meters
    pub cbm: f64,
    /// Freight cost in USD
    pub cost_usd: f64,
    /// Freight cost in GHS
    pub cost_ghs: f64,
    /// Pipeline position
    pub status: ItemStatus,
    /// Carton the item was packed into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carton_number: Option<String>,
    /// `Containers` record id the item was loaded into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    /// Public photo URLs
    pub photos: Vec<String>,
    /// Warehouse check-in date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<NaiveDate>,
    /// Free-form warehouse notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Entity for Item {
    const TABLE: &'static str = "Items";
    const NAME: &'static str = "Item";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_labels_round_trip_through_serde() -> crate::errors::Result<()> {
        for status in ItemStatus::ALL {
            let value = serde_json::to_value(status)?;
            assert_eq!(value, json!(status.label()));
        }
        let parsed: ItemStatus = serde_json::from_value(json!("Ready for Pickup"))?;
        assert_eq!(parsed, ItemStatus::ReadyForPickup);
        Ok(())
    }

    #[test]
    fn test_china_side_statuses() {
        let china: Vec<ItemStatus> = ItemStatus::ALL
            .into_iter()
            .filter(|s| s.is_china_side())
            .collect();
        assert_eq!(
            china,
            vec![ItemStatus::Received, ItemStatus::Packed, ItemStatus::Loaded]
        );
    }

    #[test]
    fn test_item_from_sparse_record() -> crate::errors::Result<()> {
        let item: Item = serde_json::from_value(json!({
            "trackingNumber": "SL240501ABCDEF",
            "customerId": "recCust",
            "status": "In Transit",
            "receivedAt": "2024-05-01"
        }))?;
        assert_eq!(item.status, ItemStatus::InTransit);
        assert!(item.photos.is_empty());
        assert_eq!(item.received_at, NaiveDate::from_ymd_opt(2024, 5, 1));
        Ok(())
    }
}
