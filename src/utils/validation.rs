use crate::utils::error::{Result, WorkerlyError};
use chrono::NaiveDate;
use std::net::SocketAddr;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> WorkerlyError {
    WorkerlyError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Azure DevOps work item ids start at 1.
pub fn validate_work_item_id(field_name: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(invalid(field_name, id, "Work item ids are positive"));
    }
    Ok(())
}

/// Inclusive window; a single-day window is allowed.
pub fn validate_date_window(field_name: &str, from: NaiveDate, to: NaiveDate) -> Result<()> {
    if from > to {
        return Err(invalid(
            field_name,
            format!("{}..{}", from, to),
            "Window ends before it starts",
        ));
    }
    Ok(())
}

pub fn validate_socket_addr(field_name: &str, value: &str) -> Result<()> {
    value
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| invalid(field_name, value, "Expected host:port, e.g. 127.0.0.1:8080"))
}

/// Case-insensitive membership in `allowed`.
pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim())) {
        return Ok(());
    }
    Err(invalid(
        field_name,
        value,
        format!("Valid values: {}", allowed.join(", ")),
    ))
}
