//! Field checks shared by the profile, product and account services.

use url::Url;

use crate::error::ApiError;

/// Trimmed value of a required text field.
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Blank optional fields are stored as NULL.
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn email(field: &str, value: &str) -> Result<String, ApiError> {
    let normalized = value.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !normalized.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::invalid_field(field, "Invalid email format"));
    }
    Ok(normalized)
}

pub fn optional_email(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    optional(value).map(|v| email(field, &v)).transpose()
}

/// Absolute http(s) URL, or nothing.
pub fn optional_url(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(raw) = optional(value) else {
        return Ok(None);
    };
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(raw)),
        _ => Err(ApiError::invalid_field(field, "Must be an absolute http(s) URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Acme ").unwrap(), "Acme");
        let err = required("name", "   ").unwrap_err();
        assert_eq!(err.to_json()["field_errors"]["name"], "name is required");
    }

    #[test]
    fn blank_optional_becomes_none() {
        assert_eq!(optional(Some("  ".into())), None);
        assert_eq!(optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(email("email", " Jo@Example.COM ").unwrap(), "jo@example.com");
        for bad in ["", "jo", "jo@", "@example.com", "jo@example", "jo@.com", "j o@example.com", "a@b@c.com"] {
            assert!(email("email", bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn urls_must_be_http() {
        assert_eq!(
            optional_url("website", Some("https://acme.io".into())).unwrap(),
            Some("https://acme.io".into())
        );
        assert!(optional_url("website", Some("acme.io".into())).is_err());
        assert!(optional_url("website", Some("ftp://acme.io".into())).is_err());
        assert_eq!(optional_url("website", Some("".into())).unwrap(), None);
    }
}
