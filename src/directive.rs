//! Scalar encoding directives using `pack`/`unpack` style letters.
//!
//! A directive is a letter choosing width and signedness, an optional byte
//! order modifier and an optional count:
//!
//! | letter | scalar |
//! |---|---|
//! | `C` / `c` | 8-bit unsigned / signed |
//! | `S` / `s` | 16-bit, native order unless modified |
//! | `L` / `l` | 32-bit, native order unless modified |
//! | `Q` / `q` | 64-bit, native order unless modified |
//! | `n` / `N` | 16 / 32-bit unsigned, big-endian |
//! | `v` / `V` | 16 / 32-bit unsigned, little-endian |
//!
//! Modifiers `<` (little), `>` (big) and `_` or `!` (native) apply to
//! `S s L l Q q`. The count is omitted (one element), a decimal number, or
//! `*` (as many as the bytes hold).

use crate::error::{BinopsError, Result};
use std::fmt;
use std::str::FromStr;

/// Byte order of multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Native,
    Little,
    Big,
}

impl Endian {
    fn is_big(self) -> bool {
        match self {
            Endian::Big => true,
            Endian::Little => false,
            Endian::Native => cfg!(target_endian = "big"),
        }
    }
}

/// How many scalars a directive consumes when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Count {
    One,
    Exactly(usize),
    All,
}

/// A fixed-width integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    letter: char,
    width: usize,
    signed: bool,
    endian: Endian,
    count: Count,
}

impl Directive {
    /// `C*`: every byte as an unsigned value.
    pub const BYTES: Directive = Directive {
        letter: 'C',
        width: 1,
        signed: false,
        endian: Endian::Native,
        count: Count::All,
    };

    /// `C`: a single unsigned byte.
    pub const BYTE: Directive = Directive {
        letter: 'C',
        width: 1,
        signed: false,
        endian: Endian::Native,
        count: Count::One,
    };

    pub fn parse(token: &str) -> Result<Self> {
        let invalid = || BinopsError::InvalidDirective(token.to_string());
        let mut chars = token.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let (width, signed, fixed_endian) = match letter {
            'C' => (1, false, Some(Endian::Native)),
            'c' => (1, true, Some(Endian::Native)),
            'S' => (2, false, None),
            's' => (2, true, None),
            'L' => (4, false, None),
            'l' => (4, true, None),
            'Q' => (8, false, None),
            'q' => (8, true, None),
            'n' => (2, false, Some(Endian::Big)),
            'N' => (4, false, Some(Endian::Big)),
            'v' => (2, false, Some(Endian::Little)),
            'V' => (4, false, Some(Endian::Little)),
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let count_at = rest
            .find(|c: char| c == '*' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (modifiers, count) = rest.split_at(count_at);

        let mut endian = None;
        for m in modifiers.chars() {
            let e = match m {
                '<' => Endian::Little,
                '>' => Endian::Big,
                '_' | '!' => Endian::Native,
                _ => return Err(invalid()),
            };
            if fixed_endian.is_some() || endian.is_some_and(|prev| prev != e) {
                return Err(invalid());
            }
            endian = Some(e);
        }

        let count = match count {
            "" => Count::One,
            "*" => Count::All,
            digits => Count::Exactly(digits.parse().map_err(|_| invalid())?),
        };

        Ok(Self {
            letter,
            width,
            signed,
            endian: fixed_endian.or(endian).unwrap_or(Endian::Native),
            count,
        })
    }

    /// Bytes per scalar.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn count(&self) -> Count {
        self.count
    }

    /// Same scalar with a different count.
    pub fn with_count(mut self, count: Count) -> Self {
        self.count = count;
        self
    }

    /// Number of bytes needed to decode the full count, None for `*`.
    pub fn byte_len(&self) -> Option<usize> {
        match self.count {
            Count::One => Some(self.width),
            Count::Exactly(n) => Some(n * self.width),
            Count::All => None,
        }
    }

    fn scalar(&self, chunk: &[u8]) -> i128 {
        let mut raw: u64 = 0;
        if self.endian.is_big() {
            for &b in chunk {
                raw = (raw << 8) | b as u64;
            }
        } else {
            for &b in chunk.iter().rev() {
                raw = (raw << 8) | b as u64;
            }
        }
        if self.signed {
            let shift = 64 - 8 * self.width as u32;
            (((raw << shift) as i64) >> shift) as i128
        } else {
            raw as i128
        }
    }

    /// Decode as many scalars as the count asks for and `bytes` holds,
    /// appending to `out`. Trailing bytes short of a full scalar are ignored.
    pub fn decode_into(&self, bytes: &[u8], out: &mut Vec<i128>) {
        let available = bytes.len() / self.width;
        let n = match self.count {
            Count::One => available.min(1),
            Count::Exactly(n) => available.min(n),
            Count::All => available,
        };
        out.extend(bytes.chunks_exact(self.width).take(n).map(|c| self.scalar(c)));
    }

    pub fn decode(&self, bytes: &[u8]) -> Vec<i128> {
        let mut out = Vec::new();
        self.decode_into(bytes, &mut out);
        out
    }

    /// First scalar in `bytes`, or None if there are fewer than
    /// [`Directive::width`] bytes.
    pub fn decode_first(&self, bytes: &[u8]) -> Option<i128> {
        bytes.get(..self.width).map(|c| self.scalar(c))
    }

    /// Smallest and largest value a scalar can hold.
    pub fn value_bounds(&self) -> (i128, i128) {
        let bits = 8 * self.width as u32;
        if self.signed {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        }
    }

    /// Append `value` encoded as one scalar.
    pub fn encode_into(&self, value: i128, out: &mut Vec<u8>) -> Result<()> {
        let (lo, hi) = self.value_bounds();
        if value < lo || value > hi {
            return Err(BinopsError::Encode {
                value,
                directive: self.to_string(),
            });
        }
        let raw = value as u64;
        if self.endian.is_big() {
            out.extend((0..self.width).rev().map(|i| (raw >> (8 * i)) as u8));
        } else {
            out.extend((0..self.width).map(|i| (raw >> (8 * i)) as u8));
        }
        Ok(())
    }
}

impl Default for Directive {
    fn default() -> Self {
        Self::BYTES
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        if matches!(self.letter, 'S' | 's' | 'L' | 'l' | 'Q' | 'q') {
            match self.endian {
                Endian::Little => f.write_str("<")?,
                Endian::Big => f.write_str(">")?,
                Endian::Native => {}
            }
        }
        match self.count {
            Count::One => Ok(()),
            Count::Exactly(n) => write!(f, "{n}"),
            Count::All => f.write_str("*"),
        }
    }
}

impl FromStr for Directive {
    type Err = BinopsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
