use std::fmt;
use time::macros::{datetime, format_description, offset};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Execution times are presented in the benchmark hosts' zone (JST).
pub const EXEC_AT_OFFSET: UtcOffset = offset!(+9);

const DATE_DIGITS: usize = 8;
const TIME_DIGITS: usize = 6;

/// Returns true iff `value` is exactly 8 ASCII digits, a hyphen, and 6 ASCII digits.
///
/// This is the only check standing between a client-supplied id and a filesystem path.
pub fn is_valid_trace_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != DATE_DIGITS + 1 + TIME_DIGITS {
        return false;
    }
    let (date, rest) = bytes.split_at(DATE_DIGITS);
    let Some((&b'-', time)) = rest.split_first() else {
        return false;
    };
    date.iter().chain(time).all(u8::is_ascii_digit)
}

/// A session directory name that passed [`is_valid_trace_id`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TraceId(String);

impl TraceId {
    pub fn parse(value: &str) -> Option<Self> {
        is_valid_trace_id(value).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decodes `YYYYMMDD-HHMMSS` as a UTC instant and shifts it to [`EXEC_AT_OFFSET`].
///
/// Shape-valid ids can still name impossible dates (month 13, Feb 30); those fall back
/// to the zero timestamp instead of dropping the session.
pub fn decode_exec_at(trace_id: &TraceId) -> OffsetDateTime {
    let format = format_description!("[year][month][day]-[hour][minute][second]");
    match PrimitiveDateTime::parse(trace_id.as_str(), format) {
        Ok(parsed) => parsed.assume_utc().to_offset(EXEC_AT_OFFSET),
        Err(_) => zero_exec_at(),
    }
}

pub fn zero_exec_at() -> OffsetDateTime {
    datetime!(0001-01-01 0:00 UTC).to_offset(EXEC_AT_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_date_dash_time_ids() {
        assert!(is_valid_trace_id("20230115-093000"));
        assert!(is_valid_trace_id("00000000-000000"));
        assert!(is_valid_trace_id("99999999-999999"));
    }

    #[test]
    fn rejects_everything_else() {
        for value in [
            "",
            "2023-01-15",
            "20230115-09300a",
            "20230115093000",
            "20230115-0930000",
            "020230115-093000",
            "20230115_093000",
            " 20230115-093000",
            "20230115-093000\n",
            "../20230115-093000",
            "20230115-093000/..",
            "2023011/-093000",
            "２0230115-093000",
            "README.md",
        ] {
            assert!(!is_valid_trace_id(value), "accepted {value:?}");
        }
    }

    #[test]
    fn trace_id_parse_matches_validator() {
        assert_eq!(
            TraceId::parse("20230115-093000").map(|id| id.to_string()),
            Some("20230115-093000".to_string())
        );
        assert_eq!(TraceId::parse("20230115-09300a"), None);
    }

    #[test]
    fn exec_at_is_utc_shifted_to_jst() {
        let id = TraceId::parse("20230115-093000").expect("valid id");
        let exec_at = decode_exec_at(&id);

        assert_eq!(exec_at.offset(), EXEC_AT_OFFSET);
        assert_eq!(exec_at, datetime!(2023-01-15 18:30:00 +9));
        assert_eq!(exec_at, datetime!(2023-01-15 09:30:00 UTC));
    }

    #[test]
    fn impossible_dates_decode_to_zero_timestamp() {
        let id = TraceId::parse("20231399-250000").expect("shape is valid");
        assert_eq!(decode_exec_at(&id), zero_exec_at());
    }
}
