//! Account management - creating dashboard users, signing in and password handling.
//!
//! Passwords are stored as Argon2 PHC strings. New accounts and password resets
//! get a generated password that is emailed to the user; when the email cannot
//! be delivered the password is handed back to the admin instead.

use super::{Actor, optional, required};
use crate::{
    config::AdminSeed,
    entities::{Profile, Record, Role, User},
    errors::{Error, Result},
    services::{Delivery, EmailMessage, Mailer},
    store::{ListQuery, Records},
    templates,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// Length of generated passwords.
pub const GENERATED_PASSWORD_LEN: usize = 12;

/// Shortest password a user may choose.
pub const MIN_PASSWORD_LEN: usize = 8;

// No 0/O, 1/l/I: passwords are often read off an email and typed by hand
const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Input for creating an account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAccount {
    /// Display name
    pub name: String,
    /// Login email, any case
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Access level
    pub role: Role,
    /// Delivery address
    pub address: Option<String>,
    /// Delivery city
    pub city: Option<String>,
    /// Explicit password; generated when absent
    pub password: Option<String>,
}

/// Profile fields that can be changed after creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    /// Display name
    pub name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Delivery address
    pub address: Option<String>,
    /// Delivery city
    pub city: Option<String>,
    /// Access level, admins only
    pub role: Option<Role>,
}

/// Result of issuing credentials to a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentials {
    /// The account the credentials belong to
    pub user: Profile,
    /// What happened to the credentials email
    pub delivery: Delivery,
    /// The password, only present when the email was not sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Hashes a password with a fresh salt.
///
/// # Errors
/// Returns `Error::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks a password against a stored hash. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Generates a random password with at least one upper-case letter, one
/// lower-case letter and one digit.
#[must_use]
pub fn generate_password() -> String {
    loop {
        let mut bytes = [0u8; GENERATED_PASSWORD_LEN];
        OsRng.fill_bytes(&mut bytes);
        let password: String = bytes
            .iter()
            .map(|b| char::from(PASSWORD_ALPHABET[usize::from(*b) % PASSWORD_ALPHABET.len()]))
            .collect();
        let mixed = password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_lowercase())
            && password.chars().any(|c| c.is_ascii_digit());
        if mixed {
            return password;
        }
    }
}

/// Lower-cases and checks the shape of an email address.
///
/// # Errors
/// Returns `Error::Validation` if the address is not `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@')
    }) && !email.contains(char::is_whitespace);
    if !valid {
        return Err(Error::validation(format!("'{email}' is not a valid email address")));
    }
    Ok(email)
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

async fn find_by_email(records: &Records, email: &str) -> Result<Option<Record<User>>> {
    let matches = records
        .query::<User>(&ListQuery::where_eq("email", email).limit(1))
        .await?;
    Ok(matches.into_iter().next())
}

/// Builds the credentials email for a new account or a password reset.
///
/// # Errors
/// Returns `Error::Template` if a template fails to render.
pub fn credentials_email(
    user: &User,
    password: &str,
    login_url: &str,
    reset: bool,
) -> Result<EmailMessage> {
    let subject = if reset {
        "Your ShipLink password has been reset".to_string()
    } else {
        "Your ShipLink account is ready".to_string()
    };
    let context = json!({
        "subject": subject,
        "company": "ShipLink",
        "name": user.name,
        "email": user.email,
        "password": password,
        "role": user.role.to_string(),
        "login_url": login_url,
        "reset": reset,
    });
    Ok(EmailMessage {
        to_email: user.email.clone(),
        to_name: user.name.clone(),
        subject,
        html: templates::render(templates::CREDENTIALS_EMAIL_HTML, &context)?,
        text: templates::render(templates::CREDENTIALS_EMAIL_TEXT, &context)?,
    })
}

async fn send_credentials(
    mailer: &Mailer,
    record: &Record<User>,
    password: String,
    login_url: &str,
    reset: bool,
) -> Result<IssuedCredentials> {
    let message = credentials_email(&record.fields, &password, login_url, reset)?;
    let delivery = mailer.deliver(&message).await;
    let password = match delivery {
        Delivery::Sent { .. } => None,
        Delivery::Logged => Some(password),
    };
    Ok(IssuedCredentials {
        user: Profile::from(record),
        delivery,
        password,
    })
}

/// Creates an account and emails its credentials.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins, `Error::Validation` for bad input
/// and `Error::DuplicateEmail` when the email is already registered.
pub async fn create_account(
    records: &Records,
    mailer: &Mailer,
    login_url: &str,
    actor: &Actor,
    request: NewAccount,
) -> Result<IssuedCredentials> {
    actor.require_admin()?;
    let name = required(&request.name, "Name")?;
    let email = normalize_email(&request.email)?;
    let password = match optional(request.password) {
        Some(chosen) => {
            check_password_strength(&chosen)?;
            chosen
        }
        None => generate_password(),
    };

    if find_by_email(records, &email).await?.is_some() {
        warn!(%email, "Rejected duplicate account");
        return Err(Error::DuplicateEmail { email });
    }

    let user = User {
        name,
        email: email.clone(),
        phone: optional(request.phone),
        role: request.role,
        password_hash: hash_password(&password)?,
        address: optional(request.address),
        city: optional(request.city),
        active: true,
        created_at: Some(Utc::now()),
    };
    let record = records.insert(&user).await.map_err(|e| {
        if e.is_duplicate_failure() {
            Error::DuplicateEmail {
                email: email.clone(),
            }
        } else {
            e
        }
    })?;
    info!(id = %record.id, %email, role = %user.role, "Account created");

    send_credentials(mailer, &record, password, login_url, false).await
}

/// Checks login credentials.
///
/// Unknown emails, wrong passwords and deactivated accounts all produce the
/// same error.
///
/// # Errors
/// Returns `Error::Unauthorized` if the credentials are not accepted.
pub async fn authenticate(records: &Records, email: &str, password: &str) -> Result<Record<User>> {
    let rejected = || Error::unauthorized("Invalid email or password");
    let Ok(email) = normalize_email(email) else {
        return Err(rejected());
    };
    let Some(record) = find_by_email(records, &email).await? else {
        return Err(rejected());
    };
    if !record.fields.active || !verify_password(password, &record.fields.password_hash) {
        warn!(%email, "Failed login");
        return Err(rejected());
    }
    info!(%email, role = %record.fields.role, "User signed in");
    Ok(record)
}

/// Lists accounts, optionally restricted to one role, sorted by name.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins.
pub async fn list_users(records: &Records, actor: &Actor, role: Option<Role>) -> Result<Vec<Profile>> {
    actor.require_admin()?;
    let users = match role {
        Some(role) => records.find_by::<User>("role", &role.to_string()).await?,
        None => records.all::<User>().await?,
    };
    let mut profiles: Vec<Profile> = users.iter().map(Profile::from).collect();
    profiles.sort_by_key(|p| p.name.to_lowercase());
    Ok(profiles)
}

/// Loads one profile; users may read their own, admins anyone's.
///
/// # Errors
/// Returns `Error::Forbidden` or `Error::NotFound`.
pub async fn get_profile(records: &Records, actor: &Actor, id: &str) -> Result<Profile> {
    if actor.role != Role::Admin && actor.user_id != id {
        return Err(Error::forbidden("You can only view your own profile"));
    }
    Ok(Profile::from(&records.get::<User>(id).await?))
}

/// Updates profile fields. Users may edit their own contact details; only
/// admins may change anyone else's or a role.
///
/// # Errors
/// Returns `Error::Forbidden`, `Error::Validation` or `Error::NotFound`.
pub async fn update_profile(
    records: &Records,
    actor: &Actor,
    id: &str,
    update: ProfileUpdate,
) -> Result<Profile> {
    let is_admin = actor.role == Role::Admin;
    if !is_admin && actor.user_id != id {
        return Err(Error::forbidden("You can only edit your own profile"));
    }
    if update.role.is_some() && !is_admin {
        return Err(Error::forbidden("Only admins can change roles"));
    }
    if is_admin && actor.user_id == id && update.role.is_some_and(|r| r != Role::Admin) {
        return Err(Error::validation("You cannot remove your own admin role"));
    }

    let mut changes = Map::new();
    if let Some(name) = update.name {
        changes.insert("name".to_string(), json!(required(&name, "Name")?));
    }
    for (field, value) in [
        ("phone", update.phone),
        ("address", update.address),
        ("city", update.city),
    ] {
        if let Some(value) = value {
            changes.insert(field.to_string(), json!(optional(Some(value))));
        }
    }
    if let Some(role) = update.role {
        changes.insert("role".to_string(), json!(role));
    }

    let record = records.patch::<User>(id, Value::Object(changes)).await?;
    info!(%id, by = %actor.user_id, "Profile updated");
    Ok(Profile::from(&record))
}

/// Activates or deactivates an account.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins and `Error::Validation` when an
/// admin tries to deactivate themselves.
pub async fn set_active(records: &Records, actor: &Actor, id: &str, active: bool) -> Result<Profile> {
    actor.require_admin()?;
    if !active && actor.user_id == id {
        return Err(Error::validation("You cannot deactivate your own account"));
    }
    let record = records
        .patch::<User>(id, json!({ "active": active }))
        .await?;
    info!(%id, active, "Account activation changed");
    Ok(Profile::from(&record))
}

/// Replaces a user's password with a generated one and emails it.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins or `Error::NotFound`.
pub async fn reset_password(
    records: &Records,
    mailer: &Mailer,
    login_url: &str,
    actor: &Actor,
    id: &str,
) -> Result<IssuedCredentials> {
    actor.require_admin()?;
    let password = generate_password();
    let record = records
        .patch::<User>(id, json!({ "passwordHash": hash_password(&password)? }))
        .await?;
    info!(%id, "Password reset");
    send_credentials(mailer, &record, password, login_url, true).await
}

/// Changes the actor's own password after checking the current one.
///
/// # Errors
/// Returns `Error::Unauthorized` if the current password is wrong and
/// `Error::Validation` if the new one is too short.
pub async fn change_password(
    records: &Records,
    actor: &Actor,
    current: &str,
    new_password: &str,
) -> Result<()> {
    check_password_strength(new_password)?;
    let record = records.get::<User>(&actor.user_id).await?;
    if !verify_password(current, &record.fields.password_hash) {
        return Err(Error::unauthorized("Current password is incorrect"));
    }
    records
        .patch::<User>(
            &actor.user_id,
            json!({ "passwordHash": hash_password(new_password)? }),
        )
        .await?;
    info!(id = %actor.user_id, "Password changed");
    Ok(())
}

/// Creates the configured admin account when no admin exists yet.
///
/// Returns the created record, or `None` if an admin was already present.
///
/// # Errors
/// Returns an error if the seed is invalid or the store call fails.
pub async fn seed_admin(records: &Records, seed: &AdminSeed) -> Result<Option<Record<User>>> {
    let admins = records
        .query::<User>(&ListQuery::where_eq("role", "admin").limit(1))
        .await?;
    if !admins.is_empty() {
        info!("Admin account already present, skipping seed");
        return Ok(None);
    }

    let email = normalize_email(&seed.email)?;
    check_password_strength(seed.password.expose())?;
    let record = records
        .insert(&User {
            name: required(&seed.name, "Admin name")?,
            email: email.clone(),
            role: Role::Admin,
            password_hash: hash_password(seed.password.expose())?,
            active: true,
            created_at: Some(Utc::now()),
            ..User::default()
        })
        .await?;
    info!(%email, "Seeded initial admin account");
    Ok(Some(record))
}
