//! Route handlers, grouped by resource

pub mod export;
pub mod references;
pub mod reports;
pub mod settings;
pub mod transactions;

use chrono::NaiveDateTime;

use crate::error::ApiError;

/// Parse a request-supplied date string, rejecting unparseable input
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDateTime, ApiError> {
    stockbook_utils::parse_datetime(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid date: {}", raw)))
}
