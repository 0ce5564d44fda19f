//! User entity - Customer, warehouse team and admin profiles.
//!
//! All three roles live in the same `Users` table and are told apart by the
//! `role` field. The password hash never leaves the server: responses use
//! [`Profile`] instead of the raw record.

use super::{Entity, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a dashboard account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including account management
    Admin,
    /// China-side warehouse staff
    Team,
    /// Shipper who owns items
    #[default]
    Customer,
}

impl Role {
    /// Whether the role belongs to brokerage staff (admin or team).
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Team)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "admin",
            Self::Team => "team",
            Self::Customer => "customer",
        };
        f.write_str(label)
    }
}

/// Fields of a `Users` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Display name
    pub name: String,
    /// Login email, stored lowercase
    pub email: String,
    /// Contact phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Access level
    pub role: Role,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Delivery address in Ghana
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Delivery city
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Deactivated accounts cannot log in
    pub active: bool,
    /// When the account was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    const TABLE: &'static str = "Users";
    const NAME: &'static str = "User";
}

/// Public view of a user record, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Record id
    pub id: String,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Access level
    pub role: Role,
    /// Delivery address
    pub address: Option<String>,
    /// Delivery city
    pub city: Option<String>,
    /// Whether the account can log in
    pub active: bool,
    /// When the account was created
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Record<User>> for Profile {
    fn from(record: &Record<User>) -> Self {
        let user = &record.fields;
        Self {
            id: record.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            address: user.address.clone(),
            city: user.city.clone(),
            active: user.active,
            created_at: user.created_at.or(record.created_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_deserializes_with_missing_cells() -> crate::errors::Result<()> {
        let user: User = serde_json::from_value(json!({
            "name": "Kwame Mensah",
            "email": "kwame@example.com",
            "role": "customer"
        }))?;
        assert_eq!(user.role, Role::Customer);
        assert!(!user.active);
        assert!(user.phone.is_none());
        assert!(user.password_hash.is_empty());
        Ok(())
    }

    #[test]
    fn test_profile_hides_password_hash() -> crate::errors::Result<()> {
        let record = Record {
            id: "rec1".to_string(),
            created_time: None,
            fields: User {
                name: "Ama".to_string(),
                email: "ama@example.com".to_string(),
                role: Role::Team,
                password_hash: "$argon2id$secret".to_string(),
                active: true,
                ..User::default()
            },
        };
        let value = serde_json::to_value(Profile::from(&record))?;
        assert_eq!(value["role"], "team");
        assert!(value.get("passwordHash").is_none());
        assert!(!value.to_string().contains("argon2"));
        Ok(())
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Team.is_staff());
        assert!(!Role::Customer.is_staff());
    }
}
