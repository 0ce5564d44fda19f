//! Invoice entity - A bill for one or more of a customer's items.

use super::Entity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Issued, not yet paid
    #[default]
    Unpaid,
    /// Settled
    Paid,
    /// Unpaid past its due date
    Overdue,
}

impl InvoiceStatus {
    /// Whether money is still owed on the invoice.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Unpaid | Self::Overdue)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
        };
        f.write_str(label)
    }
}

/// Fields of an `Invoices` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    /// Human-readable number, `INV-YYYYMMDD-NNN`
    pub invoice_number: String,
    /// Billed customer's `Users` record id
    pub customer_id: String,
    /// `Items` record ids covered by this invoice
    pub item_ids: Vec<String>,
    /// Total in USD
    pub amount_usd: f64,
    /// Total in GHS
    pub amount_ghs: f64,
    /// Payment state
    pub status: InvoiceStatus,
    /// Issue date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<NaiveDate>,
    /// Payment due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Settlement date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<NaiveDate>,
}

impl Entity for Invoice {
    const TABLE: &'static str = "Invoices";
    const NAME: &'static str = "Invoice";
}
