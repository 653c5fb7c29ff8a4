use std::time::Duration;

use crate::error::GiveawayError;

pub const MIN: Duration = Duration::from_secs(10);
pub const MAX: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Parses durations like `30s`, `10m`, `1h30m` or `2d`. A bare number is
/// taken as minutes.
pub fn parse(input: &str) -> Result<Duration, GiveawayError> {
    let invalid = || GiveawayError::InvalidDuration(input.to_string());
    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(invalid());
    }

    if let Ok(minutes) = text.parse::<u64>() {
        return bounded(Duration::from_secs(minutes.saturating_mul(60)));
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            'w' => 7 * 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        let value: u64 = number.parse().map_err(|_| invalid())?;
        total = total.saturating_add(value.saturating_mul(unit));
        number.clear();
    }
    // trailing digits without a unit
    if !number.is_empty() {
        return Err(invalid());
    }

    bounded(Duration::from_secs(total))
}

fn bounded(d: Duration) -> Result<Duration, GiveawayError> {
    if d < MIN || d > MAX {
        return Err(GiveawayError::DurationOutOfRange);
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(input: &str) -> u64 {
        parse(input).unwrap().as_secs()
    }

    #[test]
    fn single_units() {
        assert_eq!(secs("30s"), 30);
        assert_eq!(secs("10m"), 600);
        assert_eq!(secs("2h"), 7200);
        assert_eq!(secs("1d"), 86400);
        assert_eq!(secs("1w"), 7 * 86400);
    }

    #[test]
    fn combined_units_and_spacing() {
        assert_eq!(secs("1h30m"), 5400);
        assert_eq!(secs("1h 30m 15s"), 5415);
        assert_eq!(secs(" 2D "), 2 * 86400);
    }

    #[test]
    fn bare_number_is_minutes() {
        assert_eq!(secs("15"), 900);
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", "soon", "10x", "h", "1h30", "-5m"] {
            assert!(
                matches!(parse(input), Err(GiveawayError::InvalidDuration(_))),
                "{:?} should be invalid",
                input
            );
        }
    }

    #[test]
    fn bounds_are_enforced() {
        assert!(matches!(parse("5s"), Err(GiveawayError::DurationOutOfRange)));
        assert!(matches!(parse("31d"), Err(GiveawayError::DurationOutOfRange)));
        assert!(matches!(parse("0"), Err(GiveawayError::DurationOutOfRange)));
        assert_eq!(secs("10s"), 10);
        assert_eq!(secs("30d"), 30 * 86400);
    }
}
