// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidDate,
    InvalidOffset,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate => write!(f, "invalid date value; use {DATE_LAYOUT}"),
            Self::InvalidOffset => f.write_str("invalid UTC offset; use +HH:MM or -HH:MM"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Renders an instant as local wall-clock time, `DD/MM/YYYY HH:MM`.
pub fn format_local_timestamp(value: OffsetDateTime, offset: UtcOffset) -> String {
    value
        .to_offset(offset)
        .format(&format_description!(
            "[day]/[month]/[year] [hour]:[minute]"
        ))
        .unwrap_or_default()
}

pub fn parse_utc_offset(input: &str) -> ValidationResult<UtcOffset> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        trimmed,
        &format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ValidationError::InvalidOffset)
}

fn parse_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}

#[cfg(test)]
mod tests {
    use super::{
        ValidationError, format_date, format_local_timestamp, parse_optional_date,
        parse_utc_offset,
    };
    use time::macros::{date, datetime, offset};

    #[test]
    fn parse_optional_date_test() {
        assert_eq!(parse_optional_date("2024-05-01"), Ok(Some(date!(2024 - 05 - 01))));
        assert_eq!(parse_optional_date("  2024-12-31 "), Ok(Some(date!(2024 - 12 - 31))));
    }

    #[test]
    fn parse_optional_date_empty() {
        assert_eq!(parse_optional_date(""), Ok(None));
        assert_eq!(parse_optional_date("   "), Ok(None));
    }

    #[test]
    fn parse_optional_date_invalid() {
        assert_eq!(
            parse_optional_date("01/05/2024"),
            Err(ValidationError::InvalidDate)
        );
        assert_eq!(
            parse_optional_date("2024-02-30"),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn format_date_test() {
        assert_eq!(format_date(Some(date!(2024 - 05 - 01))), "2024-05-01");
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn format_local_timestamp_shifts_into_offset() {
        let instant = datetime!(2024-05-01 01:30 UTC);
        assert_eq!(
            format_local_timestamp(instant, offset!(-3)),
            "30/04/2024 22:30"
        );
        assert_eq!(
            format_local_timestamp(instant, offset!(UTC)),
            "01/05/2024 01:30"
        );
    }

    #[test]
    fn parse_utc_offset_accepts_signed_and_utc_forms() {
        assert_eq!(parse_utc_offset("-03:00"), Ok(offset!(-3)));
        assert_eq!(parse_utc_offset("+05:30"), Ok(offset!(+5:30)));
        assert_eq!(parse_utc_offset("UTC"), Ok(offset!(UTC)));
        assert_eq!(parse_utc_offset("3"), Err(ValidationError::InvalidOffset));
    }
}
