//! Input validation helpers shared by the model types

use crate::error::{Error, Result};

/// Validate that a string is a valid domain name
///
/// Basic DNS domain name validation per RFC 1035. Not comprehensive, but
/// catches the common mistakes before a record is ever sent to a provider.
pub fn validate_domain_name(field: &str, domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::validation(field, "Domain is required"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(Error::validation(
            field,
            format!("Domain name too long: {} chars (max 253)", domain.len()),
        ));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::validation(
                field,
                format!("Domain name has empty label: '{}'", domain),
            ));
        }

        if label.len() > 63 {
            return Err(Error::validation(
                field,
                format!(
                    "Domain label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                ),
            ));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::validation(
                field,
                format!(
                    "Domain label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric and hyphen only.",
                    label
                ),
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(
                field,
                format!("Domain label cannot start or end with hyphen. Label: '{}'", label),
            ));
        }
    }

    Ok(())
}

/// Validate a port string: digits only, 1..=65535
pub fn validate_port(field: &str, port: &str) -> Result<()> {
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(
            field,
            format!("Port must be a string of digits. Got: '{}'", port),
        ));
    }

    match port.parse::<u32>() {
        Ok(n) if (1..=65535).contains(&n) => Ok(()),
        _ => Err(Error::validation(
            field,
            format!("Port must be between 1 and 65535. Got: {}", port),
        )),
    }
}

/// Trim an optional input string, treating blank values as absent
///
/// HTML forms submit untouched fields as `""`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
