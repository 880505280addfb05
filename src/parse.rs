//! Numeric argument parsing.
//!
//! Operators type addresses and counts as either `0x`-prefixed hex or plain
//! decimal. Two policies are supported:
//!
//! - [`ParsePolicy::Strict`] rejects anything that is not a well-formed
//!   number for its base and reports overflow.
//! - [`ParsePolicy::Lenient`] folds every byte into the accumulator the way
//!   the classic monitor did, so stray characters silently produce a
//!   (wrong) value instead of an error.
//!
//! Hex digits are accepted in either case under both policies.

/// How malformed numeric input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Reject malformed digits, empty input and overflow.
    #[default]
    Strict,
    /// Never fail; fold every byte with wrapping arithmetic.
    Lenient,
}

/// Error types for numeric parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No digits were supplied.
    Empty,
    /// A character is not a digit of the selected base.
    InvalidDigit {
        /// The offending character.
        digit: char,
        /// Byte offset of the character within the token.
        position: usize,
    },
    /// The value does not fit in a machine word.
    Overflow,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "no digits"),
            Self::InvalidDigit { digit, position } => {
                write!(f, "invalid digit {:?} at offset {}", digit, position)
            }
            Self::Overflow => write!(f, "value does not fit in a machine word"),
        }
    }
}

impl core::error::Error for ParseError {}

/// Parse a number from an operator token.
///
/// # Arguments
/// * `text` - Token to parse (`0x` prefix selects hex, otherwise decimal)
/// * `policy` - How malformed input is handled
///
/// # Returns
/// The parsed machine word. Under [`ParsePolicy::Lenient`] this never fails.
///
/// # Examples
/// ```
/// use axmon::parse::{parse_number, ParsePolicy};
///
/// assert_eq!(parse_number("0x1A", ParsePolicy::Strict), Ok(26));
/// assert_eq!(parse_number("26", ParsePolicy::Strict), Ok(26));
/// ```
pub fn parse_number(text: &str, policy: ParsePolicy) -> Result<usize, ParseError> {
    match policy {
        ParsePolicy::Strict => parse_strict(text),
        ParsePolicy::Lenient => Ok(parse_lenient(text)),
    }
}

fn parse_strict(text: &str) -> Result<usize, ParseError> {
    let (radix, digits, skipped) = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => (16, hex, 2),
        None => (10, text, 0),
    };

    if digits.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut value: usize = 0;
    for (offset, ch) in digits.char_indices() {
        let digit = ch.to_digit(radix).ok_or(ParseError::InvalidDigit {
            digit: ch,
            position: skipped + offset,
        })?;
        value = value
            .checked_mul(radix as usize)
            .and_then(|v| v.checked_add(digit as usize))
            .ok_or(ParseError::Overflow)?;
    }

    Ok(value)
}

fn parse_lenient(text: &str) -> usize {
    let (radix, digits) = match text.as_bytes() {
        [b'0', b'x', rest @ ..] => (16usize, rest),
        bytes => (10usize, bytes),
    };

    digits.iter().fold(0usize, |acc, &byte| {
        let digit = if byte <= b'9' {
            byte as isize - b'0' as isize
        } else {
            byte.to_ascii_lowercase() as isize - b'a' as isize + 10
        };
        acc.wrapping_mul(radix).wrapping_add_signed(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_decimal() {
        assert_eq!(parse_number("0x1A", ParsePolicy::Strict), Ok(26));
        assert_eq!(parse_number("0x1a", ParsePolicy::Strict), Ok(26));
        assert_eq!(parse_number("26", ParsePolicy::Strict), Ok(26));
        assert_eq!(parse_number("0", ParsePolicy::Strict), Ok(0));
    }

    #[test]
    fn test_lenient_matches_strict_on_valid_input() {
        for token in ["0x1A", "0xdeadbeef", "0", "4096", "0xF0000000"] {
            assert_eq!(
                parse_number(token, ParsePolicy::Lenient),
                parse_number(token, ParsePolicy::Strict)
            );
        }
    }

    #[test]
    fn test_strict_rejects_garbage() {
        assert_eq!(
            parse_number("12z", ParsePolicy::Strict),
            Err(ParseError::InvalidDigit {
                digit: 'z',
                position: 2
            })
        );
        assert_eq!(
            parse_number("0xg", ParsePolicy::Strict),
            Err(ParseError::InvalidDigit {
                digit: 'g',
                position: 2
            })
        );
        assert_eq!(parse_number("", ParsePolicy::Strict), Err(ParseError::Empty));
        assert_eq!(parse_number("0x", ParsePolicy::Strict), Err(ParseError::Empty));
    }

    #[test]
    fn test_strict_overflow() {
        assert_eq!(
            parse_number("0x100000000000000000000", ParsePolicy::Strict),
            Err(ParseError::Overflow)
        );
    }

    #[test]
    fn test_lenient_folds_stray_bytes() {
        // 'z' folds to 35: 1 * 10 + 2 -> 12, 12 * 10 + 35 -> 155
        assert_eq!(parse_number("12z", ParsePolicy::Lenient), Ok(155));
        assert_eq!(parse_number("0x", ParsePolicy::Lenient), Ok(0));
    }
}
