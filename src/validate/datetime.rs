//! Free-text date/time parsing and the future-dated check.
//!
//! Input format is exactly `DD mon YY HHMM`: zero-padded two-digit day,
//! three-letter month abbreviation (case-insensitive), two-digit year
//! (2000 + YY), and a four-digit 24-hour time with no separator. The input
//! is assumed to already be expressed in the service's operating timezone
//! (UTC−7); no conversion of the input is performed. The parsed instant must
//! be strictly later than "now" evaluated in that same timezone.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::ValidationError;

/// The service's operating timezone, as a fixed offset from UTC.
pub const REFERENCE_UTC_OFFSET_HOURS: i64 = -7;

/// Fixed month-abbreviation table. Three-letter keys only.
const MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Look up a month abbreviation, case-insensitively.
fn month_number(abbrev: &str) -> Option<u32> {
    let lowered = abbrev.to_lowercase();
    MONTHS
        .iter()
        .find(|(key, _)| *key == lowered)
        .map(|(_, n)| *n)
}

/// "Now" translated into the reference timezone, as a naive local instant
/// comparable with the parsed input.
pub fn reference_now(now: DateTime<Utc>) -> NaiveDateTime {
    (now + Duration::hours(REFERENCE_UTC_OFFSET_HOURS)).naive_utc()
}

/// A component must be exactly `width` ASCII digits — single-digit values
/// still have to be supplied zero-padded.
fn fixed_width_number(text: &str, width: usize) -> Result<u32, ValidationError> {
    if text.len() != width || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Format);
    }
    text.parse().map_err(|_| ValidationError::Format)
}

/// Parse `DD mon YY HHMM` and enforce that it is in the future.
///
/// On success returns the canonical instant, ready for ISO-8601
/// serialization to the external store.
pub fn validate(text: &str, now: DateTime<Utc>) -> Result<NaiveDateTime, ValidationError> {
    // Single spaces only: a doubled space produces an empty component and
    // therefore the wrong count.
    let parts: Vec<&str> = text.split(' ').collect();
    let [day_txt, month_txt, year_txt, time_txt] = parts.as_slice() else {
        return Err(ValidationError::Format);
    };

    let day = fixed_width_number(day_txt, 2)?;
    let year = 2000 + fixed_width_number(year_txt, 2)? as i32;
    let time = fixed_width_number(time_txt, 4)?;
    let (hour, minute) = (time / 100, time % 100);

    let month = month_number(month_txt)
        .ok_or_else(|| ValidationError::UnknownMonth(month_txt.to_string()))?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(ValidationError::Format)?;
    let clock = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ValidationError::Format)?;
    let candidate = NaiveDateTime::new(date, clock);

    if candidate <= reference_now(now) {
        return Err(ValidationError::NotInFuture);
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    /// 2026-03-10 12:00:00 UTC — 05:00 in the reference timezone.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn accepts_future_instant() {
        let parsed = validate("01 jan 30 0900", fixed_now()).unwrap();
        assert_eq!(parsed.format("%Y-%m-%dT%H:%M:%S").to_string(), "2030-01-01T09:00:00");
    }

    #[test]
    fn month_abbreviation_is_case_insensitive() {
        assert!(validate("01 JAN 30 0900", fixed_now()).is_ok());
        assert!(validate("01 Jan 30 0900", fixed_now()).is_ok());
    }

    #[test]
    fn wrong_component_count_is_a_format_error() {
        for text in ["", "01", "01 jan 30", "01 jan 30 0900 extra", "01  jan 30 0900"] {
            assert_eq!(validate(text, fixed_now()), Err(ValidationError::Format), "{text:?}");
        }
    }

    #[test]
    fn unknown_month_is_its_own_error() {
        assert_eq!(
            validate("01 janvier 30 0900", fixed_now()),
            Err(ValidationError::UnknownMonth("janvier".to_string()))
        );
        assert_eq!(
            validate("01 foo 30 0900", fixed_now()),
            Err(ValidationError::UnknownMonth("foo".to_string()))
        );
    }

    #[test]
    fn no_implicit_zero_padding() {
        // Single-digit day and three-digit time must be rejected, not padded.
        assert_eq!(validate("1 jan 30 0900", fixed_now()), Err(ValidationError::Format));
        assert_eq!(validate("01 jan 30 900", fixed_now()), Err(ValidationError::Format));
    }

    #[test]
    fn past_and_present_instants_are_rejected() {
        assert_eq!(
            validate("01 jan 20 0900", fixed_now()),
            Err(ValidationError::NotInFuture)
        );
        // Exactly "now" in the reference timezone (05:00 local) is not in
        // the future.
        assert_eq!(
            validate("10 mar 26 0500", fixed_now()),
            Err(ValidationError::NotInFuture)
        );
    }

    #[test]
    fn future_within_reference_timezone_window() {
        // 08:00 local is still ahead of 05:00 local even though it is
        // already past in UTC.
        assert!(validate("10 mar 26 0800", fixed_now()).is_ok());
    }

    #[test]
    fn impossible_calendar_dates_are_format_errors() {
        assert_eq!(validate("31 feb 30 0900", fixed_now()), Err(ValidationError::Format));
        assert_eq!(validate("01 jan 30 2500", fixed_now()), Err(ValidationError::Format));
        assert_eq!(validate("01 jan 30 0970", fixed_now()), Err(ValidationError::Format));
    }

    proptest! {
        /// Any input that does not split into exactly four space-separated
        /// components is a format error, whatever the components contain.
        #[test]
        fn component_count_governs_format(parts in prop::collection::vec("[a-z0-9]{1,4}", 0..8)) {
            prop_assume!(parts.len() != 4);
            let text = parts.join(" ");
            prop_assert_eq!(validate(&text, fixed_now()), Err(ValidationError::Format));
        }
    }
}
