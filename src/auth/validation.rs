// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input validation for login and registration.

use unicode_normalization::UnicodeNormalization;

use super::error::FieldError;

/// Maximum email length (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum length of first/last names.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum password length accepted before hashing.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Canonical form used for storage and lookup: NFKC, trimmed, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

/// Validate a normalized email address.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::new("email", "Email is required"));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(FieldError::new("email", "Email is too long"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(FieldError::new("email", "Email is invalid"));
    };
    let domain_ok = !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !domain.contains("..")
        && domain
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.chars().any(|c| c.is_whitespace() || c == '@');

    if domain_ok && local_ok {
        Ok(())
    } else {
        Err(FieldError::new("email", "Email is invalid"))
    }
}

/// Validate a required name field.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, "This field is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(FieldError::new(field, "This field is too long"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(FieldError::new(field, "This field contains invalid characters"));
    }
    Ok(())
}

/// Validate an optional phone number: digits with an optional leading `+`
/// and common separators, 7 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), FieldError> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if allowed && (7..=15).contains(&digits) {
        Ok(())
    } else {
        Err(FieldError::new("phone", "Phone number is invalid"))
    }
}
