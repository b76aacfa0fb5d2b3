use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::Result;

/// Current UTC time rendered as RFC 3339.
///
/// # Errors
///
/// Returns `CoreError::TimeError` if the timestamp cannot be formatted.
pub fn now_rfc3339() -> Result<String> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

/// Like [`now_rfc3339`] but never fails; falls back to Unix seconds.
pub fn timestamp() -> String {
    now_rfc3339().unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
