//! Wrappers around the hosted image and mail services.
//!
//! Both are thin pass-throughs to documented HTTP APIs. Each sits behind a
//! trait so the page logic can be exercised without network access.

/// Hosted image upload
pub mod images;
/// Email delivery with a logged fallback
pub mod mail;

pub use images::{CloudinaryUploader, PhotoHost, UploadedImage};
pub use mail::{Delivery, EmailMessage, Mailer, MailTransport};
