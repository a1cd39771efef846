//! Client-side validation. Runs before any request is built; a failure
//! never reaches the network.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A form field that failed validation, with inline help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Returns the trimmed message, or an error if nothing is left.
pub fn validate_message(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new("message", "Message cannot be empty"))
    } else {
        Ok(trimmed)
    }
}

/// A deliberately loose check: one `@`, a non-empty local part, and a
/// dotted domain with no empty labels.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Phone numbers may use spaces, dashes, dots, parentheses and a leading `+`,
/// and must carry 7 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
    {
        return false;
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

/// The customer create/edit form.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl CustomerForm {
    /// Every failing field, in form order.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "Name is required"));
        }
        if self.email.trim().is_empty() {
            errors.push(ValidationError::new("email", "Email is required"));
        } else if !is_valid_email(&self.email) {
            errors.push(ValidationError::new("email", "Enter a valid email address"));
        }
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty())
            && !is_valid_phone(phone)
        {
            errors.push(ValidationError::new("phone", "Enter a valid phone number"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
