//! HTML and text templates for emails and print previews.
//!
//! Template files live next to this module and are compiled into the binary.
//! Templates named `*.html` are auto-escaped, so record values can be passed
//! in as they are; the `.txt` email body is not.

use crate::{core::round_to, errors::Result};
use minijinja::Environment;
use serde::Serialize;

/// Credentials email, HTML body
pub const CREDENTIALS_EMAIL_HTML: &str = "credentials_email.html";
/// Credentials email, plain-text body
pub const CREDENTIALS_EMAIL_TEXT: &str = "credentials_email.txt";
/// Container packing list print preview
pub const PACKING_LIST: &str = "packing_list.html";
/// Invoice print preview
pub const INVOICE: &str = "invoice.html";

const SOURCES: [(&str, &str); 4] = [
    (
        CREDENTIALS_EMAIL_HTML,
        include_str!("templates/credentials_email.html"),
    ),
    (
        CREDENTIALS_EMAIL_TEXT,
        include_str!("templates/credentials_email.txt"),
    ),
    (PACKING_LIST, include_str!("templates/packing_list.html")),
    (INVOICE, include_str!("templates/invoice.html")),
];

/// Renders a named template with a serializable context.
///
/// # Errors
/// Returns `Error::Template` if the template is unknown or rendering fails.
pub fn render<T: Serialize>(name: &str, context: &T) -> Result<String> {
    let env = environment()?;
    let template = env.get_template(name)?;
    Ok(template.render(context)?)
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    for (name, source) in SOURCES {
        env.add_template(name, source)?;
    }
    env.add_filter("money", money);
    env.add_filter("cbm", cbm);
    Ok(env)
}

/// Two decimals with thousands separators: `12345.5` becomes `12,345.50`.
#[must_use]
pub fn money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Volume with three decimals, rounded half away from zero like stored volumes.
#[must_use]
pub fn cbm(value: f64) -> String {
    format!("{:.3}", round_to(value, 3))
}
