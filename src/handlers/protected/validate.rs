// handlers/protected/validate.rs - Request field validation shared by the /api handlers
//
// Every failure is a 422 carrying the offending field in `field_errors`.

use url::Url;

use crate::error::ApiError;

/// Trims `value` and checks it holds between `min` and `max` characters
pub fn text(field: &str, value: &str, min: usize, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min == 1 {
            ApiError::invalid_field(field, format!("{} must not be empty", field))
        } else {
            ApiError::invalid_field(field, format!("{} must be at least {} characters", field, min))
        });
    }
    if len > max {
        return Err(ApiError::invalid_field(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Absolute http(s) URL, as used for post images and profile photos
pub fn http_url(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(value.to_string()),
        _ => Err(ApiError::invalid_field(field, format!("{} must be an http(s) URL", field))),
    }
}

/// Any absolute URL (`ipfs://`, `ar://`, `https://`...)
pub fn any_url(field: &str, value: &str) -> Result<String, ApiError> {
    let value = text(field, value, 1, 2048)?;
    Url::parse(&value).map_err(|_| ApiError::invalid_field(field, format!("{} must be an absolute URL", field)))?;
    Ok(value)
}

pub const MAX_TAG_CHARS: usize = 10;

/// Tags are compared verbatim, so they are not trimmed
pub fn tag(value: &str) -> Result<String, ApiError> {
    if value.is_empty() {
        return Err(ApiError::invalid_field("tag", "tag must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ApiError::invalid_field("tag", "tag must not contain spaces"));
    }
    if value.chars().count() > MAX_TAG_CHARS {
        return Err(ApiError::invalid_field(
            "tag",
            format!("tag must be at most {} characters", MAX_TAG_CHARS),
        ));
    }
    Ok(value.to_string())
}

/// Three-letter style codes such as `ETH` or `USDC`
pub fn currency(value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value.len() <= 10
        && value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(value.to_string())
    } else {
        Err(ApiError::invalid_field(
            "currency",
            "currency must be 1-10 uppercase letters or digits",
        ))
    }
}
