use once_cell::sync::Lazy;
use regex::Regex;

use crate::comment::GENERAL_TIMESTAMP;

pub const GENERAL_LABEL: &str = "General";

static TIMECODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:(\d+):)?(\d+):)?(\d+)(?:\.(\d+))?$").expect("valid timecode regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("timecode is empty")]
    Empty,
    #[error("invalid timecode {0:?}; expected SS, MM:SS or H:MM:SS")]
    Malformed(String),
    #[error("timecode {0:?} is out of range")]
    OutOfRange(String),
}

pub fn format(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return GENERAL_LABEL.to_string();
    }
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

pub fn parse(input: &str) -> Result<f64, TimecodeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimecodeError::Empty);
    }
    if trimmed == "-" || trimmed.eq_ignore_ascii_case("general") {
        return Ok(GENERAL_TIMESTAMP);
    }

    let caps = TIMECODE_RE
        .captures(trimmed)
        .ok_or_else(|| TimecodeError::Malformed(trimmed.to_string()))?;
    let field = |idx: usize| -> Result<Option<u64>, TimecodeError> {
        caps.get(idx)
            .map(|m| {
                m.as_str()
                    .parse::<u64>()
                    .map_err(|_| TimecodeError::Malformed(trimmed.to_string()))
            })
            .transpose()
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let secs = field(3)?.unwrap_or(0);
    if minutes.is_some() && secs >= 60 {
        return Err(TimecodeError::OutOfRange(trimmed.to_string()));
    }
    if hours.is_some() && minutes.unwrap_or(0) >= 60 {
        return Err(TimecodeError::OutOfRange(trimmed.to_string()));
    }

    let fraction = match caps.get(4) {
        Some(m) => format!("0.{}", m.as_str())
            .parse::<f64>()
            .map_err(|_| TimecodeError::Malformed(trimmed.to_string()))?,
        None => 0.0,
    };

    let whole = hours
        .unwrap_or(0)
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes.unwrap_or(0).checked_mul(60)?))
        .and_then(|hm| hm.checked_add(secs))
        .ok_or_else(|| TimecodeError::OutOfRange(trimmed.to_string()))?;
    Ok(whole as f64 + fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format(0.0), "00:00");
        assert_eq!(format(5.9), "00:05");
        assert_eq!(format(75.0), "01:15");
        assert_eq!(format(3725.0), "1:02:05");
        assert_eq!(format(GENERAL_TIMESTAMP), GENERAL_LABEL);
    }

    #[test]
    fn parses_supported_shapes() {
        assert_eq!(parse("75").unwrap(), 75.0);
        assert_eq!(parse("7.5").unwrap(), 7.5);
        assert_eq!(parse("01:15").unwrap(), 75.0);
        assert_eq!(parse("1:02:05.25").unwrap(), 3725.25);
        assert_eq!(parse(" general ").unwrap(), GENERAL_TIMESTAMP);
        assert_eq!(parse("-").unwrap(), GENERAL_TIMESTAMP);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse(""), Err(TimecodeError::Empty));
        assert!(matches!(parse("1:2:3:4"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse("abc"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse("1:75"), Err(TimecodeError::OutOfRange(_))));
        assert!(matches!(parse("1:60:00"), Err(TimecodeError::OutOfRange(_))));
    }

    #[test]
    fn huge_hours_are_out_of_range() {
        assert!(matches!(
            parse("9999999999999999:00:00"),
            Err(TimecodeError::OutOfRange(_))
        ));
        assert!(matches!(
            parse("99999999999999999999"),
            Err(TimecodeError::Malformed(_))
        ));
    }

    #[test]
    fn format_then_parse_is_whole_seconds() {
        assert_eq!(parse(&format(3725.8)).unwrap(), 3725.0);
    }
}
