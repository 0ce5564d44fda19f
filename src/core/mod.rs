//! Core business logic - framework-agnostic page operations.
//!
//! Each module backs one area of the dashboard. Functions take the typed
//! [`Records`](crate::store::Records) handle plus the acting user, check the
//! role, and return plain data the web layer serializes as-is.

pub mod accounts;
pub mod announcements;
pub mod containers;
pub mod dashboard;
pub mod invoices;
pub mod items;
pub mod packaging;
pub mod print;
pub mod support;

use crate::{
    entities::{Profile, Record, Role, User},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};

/// The signed-in user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// `Users` record id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Access level
    pub role: Role,
}

impl Actor {
    /// Builds an actor from a user record.
    #[must_use]
    pub fn from_record(record: &Record<User>) -> Self {
        Self {
            user_id: record.id.clone(),
            name: record.fields.name.clone(),
            role: record.fields.role,
        }
    }

    /// Builds an actor from a freshly saved profile.
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            user_id: profile.id.clone(),
            name: profile.name.clone(),
            role: profile.role,
        }
    }

    /// Fails unless the actor is an admin.
    ///
    /// # Errors
    /// Returns `Error::Forbidden` for team members and customers.
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(Error::forbidden("Only admins can do this"))
        }
    }

    /// Fails unless the actor is an admin or team member.
    ///
    /// # Errors
    /// Returns `Error::Forbidden` for customers.
    pub fn require_staff(&self) -> Result<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(Error::forbidden("Only staff can do this"))
        }
    }

    /// Whether the actor may see records owned by `customer_id`.
    #[must_use]
    pub fn can_see_customer(&self, customer_id: &str) -> bool {
        self.role.is_staff() || self.user_id == customer_id
    }
}

/// Rounds to a fixed number of decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Today's date in UTC.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Trims a required text field.
///
/// # Errors
/// Returns `Error::Validation` naming the field when it is blank.
pub fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field, treating blank as absent.
#[must_use]
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
