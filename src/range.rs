//! Byte range tokens: `N`, `A..B`, `A..`, `..B`, `..`.
//!
//! A [`ByteRange`] is unresolved: negative endpoints count from the end of a
//! length that is only known when the range is applied to a record. Use
//! [`ByteRange::resolve`] at the point of use.

use crate::error::{BinopsError, Result};
use memchr::memmem;
use std::fmt;
use std::str::FromStr;

/// Default start of an open range (`..B`).
pub const DEFAULT_FROM: i64 = 0;

/// Default end of an open range (`A..`), i.e. the last byte.
pub const DEFAULT_TO: i64 = -1;

/// Parse an optionally negative decimal or `0x`/`0X` hexadecimal integer.
///
/// Returns None for anything else, including a leading `+` and empty digits.
pub fn parse_integer(token: &str) -> Option<i128> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, rest),
    };
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_endpoint(part: &str, default: i64, token: &str) -> Result<i64> {
    if part.is_empty() {
        return Ok(default);
    }
    parse_integer(part)
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| BinopsError::NotARange(token.to_string()))
}

/// An inclusive (or, when built from Rust code, exclusive-end) range of byte
/// indexes whose negative endpoints are relative to a later-known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub from: i64,
    pub to: i64,
    pub exclusive: bool,
}

/// A resolved, clamped window into a record: `len` bytes starting at `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: u64,
    pub len: u64,
}

impl Span {
    pub const EMPTY: Span = Span { from: 0, len: 0 };

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteRange {
    /// Inclusive range `from..to`.
    pub const fn new(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            exclusive: false,
        }
    }

    /// Single index `n..n`.
    pub const fn index(n: i64) -> Self {
        Self::new(n, n)
    }

    /// Half-open range `from...end`; `end` is excluded once resolved.
    pub const fn half_open(from: i64, end: i64) -> Self {
        Self {
            from,
            to: end,
            exclusive: true,
        }
    }

    /// The whole record, `0..-1`.
    pub const fn all() -> Self {
        Self::new(DEFAULT_FROM, DEFAULT_TO)
    }

    /// True when no endpoint depends on the record length.
    pub fn is_absolute(&self) -> bool {
        self.from >= 0 && self.to >= 0
    }

    /// Smallest index in the range, if the range is non-empty without
    /// resolving against a length.
    pub fn min(&self) -> Option<i64> {
        let last = if self.exclusive {
            self.to.checked_sub(1)?
        } else {
            self.to
        };
        (self.from <= last).then_some(self.from)
    }

    /// Resolve against a record length.
    ///
    /// `length` of None means the record is unbounded; negative endpoints
    /// then cannot be resolved. Ranges past the end of the record resolve to
    /// an empty span and ranges that run over the end are truncated.
    pub fn resolve(&self, length: Option<u64>) -> Result<Span> {
        let resolve_one = |index: i64| -> Result<i128> {
            if index >= 0 {
                return Ok(index as i128);
            }
            match length {
                Some(len) => Ok(len as i128 + index as i128),
                None => Err(BinopsError::UnresolvedNegative { index }),
            }
        };

        let mut from = resolve_one(self.from)?;
        let mut to = resolve_one(self.to)?;
        if self.exclusive {
            to -= 1;
        }
        // Indexes before the record start are clipped rather than read.
        if from < 0 {
            from = 0;
        }
        let mut requested = to - from + 1;
        if requested < 0 {
            return Ok(Span::EMPTY);
        }
        if let Some(len) = length {
            let len = len as i128;
            if from >= len {
                return Ok(Span::EMPTY);
            }
            if from + requested > len {
                requested = len - from;
            }
        }
        Ok(Span {
            from: from as u64,
            len: requested as u64,
        })
    }

    /// Expand to concrete values: ascending when `to >= from`, else
    /// descending.
    pub fn values(&self) -> impl Iterator<Item = i64> {
        let (from, to, exclusive) = (self.from, self.to, self.exclusive);
        let descending = to < from;
        let count = if descending {
            (from as i128 - to as i128 + 1) as u128
        } else {
            (to as i128 - from as i128 + 1) as u128
        };
        let count = if exclusive { count - 1 } else { count };
        (0..count).map(move |i| {
            if descending {
                (from as i128 - i as i128) as i64
            } else {
                (from as i128 + i as i128) as i64
            }
        })
    }
}

impl Default for ByteRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = if self.exclusive { "..." } else { ".." };
        write!(f, "{}{}{}", self.from, dots, self.to)
    }
}

impl FromStr for ByteRange {
    type Err = BinopsError;

    fn from_str(s: &str) -> Result<Self> {
        parse_range(s)
    }
}

/// Parse ranges such as `"0x42"`, `"3"`, `"1..3"`, `"0..-1"`, `"3..0xf"`,
/// `"..4"` or `"2.."`.
///
/// Omitted endpoints default to `0` and `-1`. Exclusive `a...b` ranges and
/// repeated `..` are rejected.
pub fn parse_range(token: &str) -> Result<ByteRange> {
    let bytes = token.as_bytes();
    let mut dots = memmem::find_iter(bytes, b"..");
    let Some(at) = dots.next() else {
        if token.is_empty() {
            return Err(BinopsError::NotARange(token.to_string()));
        }
        return parse_endpoint(token, DEFAULT_FROM, token).map(ByteRange::index);
    };
    if dots.next().is_some() {
        return Err(BinopsError::NotARange(token.to_string()));
    }
    let from = parse_endpoint(&token[..at], DEFAULT_FROM, token)?;
    let to = parse_endpoint(&token[at + 2..], DEFAULT_TO, token)?;
    Ok(ByteRange::new(from, to))
}

/// A range known to be ascending with a non-negative first index, e.g. the
/// location of a length field inside a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositiveIncreasingRange(ByteRange);

impl PositiveIncreasingRange {
    pub fn range(&self) -> ByteRange {
        self.0
    }

    /// First byte index.
    pub fn first(&self) -> u64 {
        self.0.from as u64
    }

    /// Number of bytes covered. Never zero.
    pub fn width(&self) -> u64 {
        (self.0.to - self.0.from + 1) as u64
    }
}

/// Same as [`parse_range`] but rejects e.g. `"-1"`, `"-1..0"`, `"2..1"` and
/// `"0..-1"`.
pub fn parse_positive_increasing_range(token: &str) -> Result<PositiveIncreasingRange> {
    let range = parse_range(token)?;
    let min = range
        .min()
        .ok_or_else(|| BinopsError::NotIncreasing(token.to_string()))?;
    if min < 0 {
        return Err(BinopsError::NotPositive(token.to_string()));
    }
    Ok(PositiveIncreasingRange(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-0xA"), Some(-10));
        assert_eq!(parse_integer("0Xff"), Some(255));
        assert_eq!(parse_integer("ff"), None);
        assert_eq!(parse_integer("+1"), None);
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1").unwrap(), ByteRange::new(1, 1));
        assert_eq!(parse_range("1..3").unwrap(), ByteRange::new(1, 3));
        assert_eq!(parse_range("-3..-1").unwrap(), ByteRange::new(-3, -1));
        assert_eq!(parse_range("0..-1").unwrap(), ByteRange::new(0, -1));
        assert_eq!(parse_range("-1..1").unwrap(), ByteRange::new(-1, 1));
        assert_eq!(parse_range("2..1").unwrap(), ByteRange::new(2, 1));

        assert_eq!(parse_range("-0xA").unwrap(), ByteRange::new(-10, -10));
        assert_eq!(parse_range("0xa..0xf").unwrap(), ByteRange::new(10, 15));
        assert_eq!(parse_range("-0xf..10").unwrap(), ByteRange::new(-15, 10));
    }

    #[test]
    fn test_parse_open_ranges() {
        assert_eq!(parse_range("..").unwrap(), ByteRange::all());
        assert_eq!(parse_range("..3").unwrap(), ByteRange::new(0, 3));
        assert_eq!(parse_range("-2..").unwrap(), ByteRange::new(-2, -1));
    }

    #[test]
    fn test_parse_range_rejects() {
        for bad in ["foo", "1...2", "1..2..3", "0-3", "", "1..x", "+1"] {
            match parse_range(bad) {
                Err(BinopsError::NotARange(t)) => assert_eq!(t, bad),
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_single_equals_degenerate_range() {
        for n in ["0", "7", "-7", "0x1f", "-0X1F"] {
            assert_eq!(
                parse_range(n).unwrap(),
                parse_range(&format!("{n}..{n}")).unwrap()
            );
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for token in ["5", "1..3", "..", "-0x10..", "..-2", "9..0xB"] {
            let range = parse_range(token).unwrap();
            assert_eq!(parse_range(&range.to_string()).unwrap(), range);
        }
    }

    #[test]
    fn test_parse_positive_increasing_range() {
        let r = parse_positive_increasing_range("0xa").unwrap();
        assert_eq!(r.range(), ByteRange::new(10, 10));
        assert_eq!(r.width(), 1);
        let r = parse_positive_increasing_range("1..3").unwrap();
        assert_eq!((r.first(), r.width()), (1, 3));

        assert!(matches!(
            parse_positive_increasing_range("-1"),
            Err(BinopsError::NotPositive(_))
        ));
        assert!(matches!(
            parse_positive_increasing_range("-1..0"),
            Err(BinopsError::NotPositive(_))
        ));
        assert!(matches!(
            parse_positive_increasing_range("2..1"),
            Err(BinopsError::NotIncreasing(_))
        ));
        assert!(matches!(
            parse_positive_increasing_range("0..-1"),
            Err(BinopsError::NotIncreasing(_))
        ));
        assert!(matches!(
            parse_positive_increasing_range("1...1"),
            Err(BinopsError::NotARange(_))
        ));
    }

    #[test]
    fn test_resolve_within_length() {
        let span = ByteRange::new(1, 2).resolve(Some(3)).unwrap();
        assert_eq!(span, Span { from: 1, len: 2 });
        let span = ByteRange::new(-2, -1).resolve(Some(3)).unwrap();
        assert_eq!(span, Span { from: 1, len: 2 });
        let span = ByteRange::half_open(0, 2).resolve(Some(3)).unwrap();
        assert_eq!(span, Span { from: 0, len: 2 });
    }

    #[test]
    fn test_resolve_truncates_and_empties() {
        assert_eq!(
            ByteRange::new(1, 10).resolve(Some(3)).unwrap(),
            Span { from: 1, len: 2 }
        );
        assert!(ByteRange::new(3, 3).resolve(Some(3)).unwrap().is_empty());
        assert!(ByteRange::new(3, 10).resolve(Some(3)).unwrap().is_empty());
        assert!(ByteRange::new(1, 0).resolve(Some(3)).unwrap().is_empty());
        assert_eq!(
            ByteRange::new(-10, -1).resolve(Some(3)).unwrap(),
            Span { from: 0, len: 3 }
        );
    }

    #[test]
    fn test_resolve_unbounded() {
        assert_eq!(
            ByteRange::new(4, 7).resolve(None).unwrap(),
            Span { from: 4, len: 4 }
        );
        assert!(matches!(
            ByteRange::all().resolve(None),
            Err(BinopsError::UnresolvedNegative { index: -1 })
        ));
    }

    #[test]
    fn test_values() {
        let up: Vec<i64> = ByteRange::new(9, 11).values().collect();
        assert_eq!(up, vec![9, 10, 11]);
        let down: Vec<i64> = ByteRange::new(6, 4).values().collect();
        assert_eq!(down, vec![6, 5, 4]);
        let half: Vec<i64> = ByteRange::half_open(0, 3).values().collect();
        assert_eq!(half, vec![0, 1, 2]);
    }
}
