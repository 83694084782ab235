//! Request payload validation.
//!
//! Checks run against the whole payload and collect every failing field, so a
//! single 400 response reports all problems at once.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: message.into(),
            });
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, format!("{field} is required"))
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        self.check(
            value.trim().chars().count() <= max,
            field,
            format!("{field} cannot exceed {max} characters"),
        )
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        self.check(
            value.chars().count() >= min,
            field,
            format!("{field} must be at least {min} characters"),
        )
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_valid_email(value), field, "invalid email address")
    }

    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_valid_phone(value), field, "invalid phone number")
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value > 0, field, format!("{field} must be greater than zero"))
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(
            value >= 0,
            field,
            format!("{field} must be a non-negative number"),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when every check passed, otherwise `AppError::Validation`.
    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Loose structural check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// Digits with optional leading `+` and spaces/dashes/parentheses as separators.
pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    let body = value.strip_prefix('+').unwrap_or(value);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
    {
        return false;
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}
