//! Go-style duration strings: `300ms`, `30s`, `5m`, `1h30m`, `1.5h`.

use std::time::Duration;

use thiserror::Error;

/// A duration string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct ParseDurationError {
    /// Rejected input.
    pub input: String,
    /// What is wrong with it.
    pub reason: &'static str,
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse a sequence of decimal numbers, each with a unit suffix.
///
/// A bare `0` is accepted as zero. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let fail = |reason| ParseDurationError {
        input: input.to_string(),
        reason,
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(fail("empty duration"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(fail("expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(fail("missing unit"));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| fail("unknown unit"))?;

        let nanos = scaled(number, scale).ok_or_else(|| fail("invalid number"))?;
        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| fail("overflow"))?;
        rest = next;
    }

    u64::try_from(total_nanos)
        .map(Duration::from_nanos)
        .map_err(|_| fail("overflow"))
}

/// `number * scale` in whole nanoseconds, with an optional fractional part.
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }

    let mut nanos = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?.checked_mul(scale)?
    };

    let mut place = scale;
    for digit in frac.chars() {
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(u128::from(digit.to_digit(10)?) * place)?;
    }
    Some(nanos)
}
