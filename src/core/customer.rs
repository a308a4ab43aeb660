use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Contact details captured on the welcome screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("Please provide both your name and contact number.")]
    MissingField,
    #[error("Please enter a valid phone number.")]
    InvalidPhone,
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9\s\-+]+$").expect("phone pattern compiles"))
}

impl CustomerDetails {
    /// Validate raw form input.
    ///
    /// Both fields must be non-blank. The phone may only contain ASCII digits,
    /// whitespace, hyphens and plus signs. Accepted values are stored trimmed.
    pub fn from_form(name: &str, phone: &str) -> Result<Self, ContactError> {
        let name = name.trim();
        let phone_trimmed = phone.trim();
        if name.is_empty() || phone_trimmed.is_empty() {
            return Err(ContactError::MissingField);
        }
        if !phone_pattern().is_match(phone) {
            return Err(ContactError::InvalidPhone);
        }

        Ok(Self {
            name: name.to_string(),
            phone: phone_trimmed.to_string(),
        })
    }
}
