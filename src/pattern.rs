//! Generated binary patterns: `LIST[:DIRECTIVE][^REPEAT]`.
//!
//! `LIST` is a comma-separated list of range tokens. Each range expands
//! ascending or descending depending on its endpoints, the expansions are
//! concatenated, the flattened sequence is repeated `REPEAT` times and every
//! element is encoded with `DIRECTIVE` (default `C*`).
//!
//! ```
//! use binops::pattern::generate;
//!
//! assert_eq!(generate("1").unwrap(), vec![1]);
//! assert_eq!(generate("1,6..4,0xf^2").unwrap(), vec![1, 6, 5, 4, 15, 1, 6, 5, 4, 15]);
//! assert_eq!(generate("9..0xB:S>").unwrap(), vec![0, 9, 0, 10, 0, 11]);
//! ```

use crate::directive::Directive;
use crate::error::{BinopsError, Result};
use crate::range::{parse_range, ByteRange};
use std::fmt;
use std::str::FromStr;

/// Usage string for command line help.
pub const PATTERN_SYNTAX: &str = "N,N..M,...[:DIRECTIVE=C*][^REPEAT=1]";

/// A parsed pattern, ready to be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    pub ranges: Vec<ByteRange>,
    pub directive: Directive,
    pub repeat: usize,
}

impl PatternSpec {
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |message: &str| BinopsError::InvalidPattern {
            token: token.to_string(),
            message: message.to_string(),
        };

        let (body, repeat) = match token.split_once('^') {
            Some((body, repeat)) => {
                let repeat: usize = repeat
                    .parse()
                    .map_err(|_| invalid("repeat count is not a number"))?;
                if repeat == 0 {
                    return Err(invalid("repeat count must be positive"));
                }
                (body, repeat)
            }
            None => (token, 1),
        };

        let (list, directive) = match body.split_once(':') {
            Some((list, d)) => (list, Directive::parse(d)?),
            None => (body, Directive::BYTES),
        };
        if list.is_empty() {
            return Err(invalid("empty value list"));
        }

        let ranges = list
            .split(',')
            .map(parse_range)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ranges,
            directive,
            repeat,
        })
    }

    /// The flattened value sequence, before repetition.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.ranges.iter().flat_map(|r| r.values())
    }

    /// Encode the pattern into a fresh buffer.
    pub fn generate(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.generate_into(&mut out)?;
        Ok(out)
    }

    /// Append the encoded pattern to `out`. On error `out` may hold a
    /// partial pattern.
    pub fn generate_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let once_start = out.len();
        for value in self.values() {
            self.directive.encode_into(value as i128, out)?;
        }
        let once_end = out.len();
        for _ in 1..self.repeat {
            out.extend_from_within(once_start..once_end);
        }
        Ok(())
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if range.from == range.to {
                write!(f, "{}", range.from)?;
            } else {
                write!(f, "{range}")?;
            }
        }
        write!(f, ":{}^{}", self.directive, self.repeat)
    }
}

impl FromStr for PatternSpec {
    type Err = BinopsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse and generate a pattern in one step.
pub fn generate(token: &str) -> Result<Vec<u8>> {
    PatternSpec::parse(token)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        assert_eq!(generate("1").unwrap(), vec![1]);
        assert_eq!(generate("0x13,0x37").unwrap(), vec![0x13, 0x37]);
    }

    #[test]
    fn test_multibyte_repeat() {
        let spec = PatternSpec::parse("9..0xB:S*^2").unwrap();
        assert_eq!(spec.repeat, 2);
        assert_eq!(spec.values().collect::<Vec<_>>(), vec![9, 10, 11]);

        let mut expected = Vec::new();
        for v in [9u16, 10, 11, 9, 10, 11] {
            expected.extend_from_slice(&v.to_ne_bytes());
        }
        assert_eq!(spec.generate().unwrap(), expected);
    }

    #[test]
    fn test_descending_and_repeat() {
        let once = [1u8, 6, 5, 4, 15];
        let expected: Vec<u8> = once.iter().copied().cycle().take(15).collect();
        assert_eq!(generate("1,6..4,0xf^3").unwrap(), expected);
    }

    #[test]
    fn test_endian_directives() {
        assert_eq!(generate("0x1234:l>").unwrap(), vec![0, 0, 0x12, 0x34]);
        assert_eq!(generate("0x5678:s<").unwrap(), vec![0x78, 0x56]);
        assert_eq!(generate("-2..-1:c").unwrap(), vec![0xfe, 0xff]);
    }

    #[test]
    fn test_value_too_large() {
        assert!(matches!(generate("256"), Err(BinopsError::Encode { value: 256, .. })));
        assert!(generate("256:S").is_ok());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(generate("foo"), Err(BinopsError::NotARange(_))));
        assert!(matches!(generate("1^0"), Err(BinopsError::InvalidPattern { .. })));
        assert!(matches!(generate("1^x"), Err(BinopsError::InvalidPattern { .. })));
        assert!(matches!(generate(":C"), Err(BinopsError::InvalidPattern { .. })));
        assert!(matches!(generate("1:Z"), Err(BinopsError::InvalidDirective(_))));
    }

    #[test]
    fn test_display_roundtrip() {
        let spec = PatternSpec::parse("1,6..4,0xf:S<*^3").unwrap();
        assert_eq!(spec.to_string(), "1,6..4,15:S<*^3");
        assert_eq!(PatternSpec::parse(&spec.to_string()).unwrap(), spec);
    }
}
