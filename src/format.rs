//! Single-value printf-style templates, e.g. `"%02x"` or `"0x%04X,"`.
//!
//! A template holds literal text around exactly one conversion
//! `%[flags][width][.precision]conv` with flags from `-0+ #` and `conv` one
//! of `d i u x X o b B c`. `%%` is a literal percent sign.

use crate::error::{BinopsError, Result};

/// Conversion character of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Decimal,
    LowerHex,
    UpperHex,
    Octal,
    Binary,
    Char,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alternate: bool,
}

/// A parsed template, rendered once per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    prefix: String,
    suffix: String,
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

impl FormatTemplate {
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |message: &str| BinopsError::InvalidFormat {
            token: token.to_string(),
            message: message.to_string(),
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec = None;
        let mut chars = token.chars().peekable();

        while let Some(c) = chars.next() {
            let text = if spec.is_some() {
                &mut suffix
            } else {
                &mut prefix
            };
            if c != '%' {
                text.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                text.push('%');
                continue;
            }
            if spec.is_some() {
                return Err(invalid("more than one conversion"));
            }

            let mut flags = Flags::default();
            while let Some(&f) = chars.peek() {
                match f {
                    '-' => flags.left = true,
                    '0' => flags.zero = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '#' => flags.alternate = true,
                    _ => break,
                }
                chars.next();
            }

            let mut width = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                width = width * 10 + d as usize;
                chars.next();
            }

            let mut precision = None;
            if chars.peek() == Some(&'.') {
                chars.next();
                let mut p = 0usize;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                    p = p * 10 + d as usize;
                    chars.next();
                }
                precision = Some(p);
            }

            let conversion = match chars.next() {
                Some('d' | 'i' | 'u') => Conversion::Decimal,
                Some('x') => Conversion::LowerHex,
                Some('X') => Conversion::UpperHex,
                Some('o') => Conversion::Octal,
                Some('b' | 'B') => Conversion::Binary,
                Some('c') => Conversion::Char,
                Some(_) => return Err(invalid("unsupported conversion")),
                None => return Err(invalid("incomplete conversion")),
            };
            spec = Some((flags, width, precision, conversion));
        }

        let (flags, width, precision, conversion) =
            spec.ok_or_else(|| invalid("no conversion"))?;
        Ok(Self {
            prefix,
            suffix,
            flags,
            width,
            precision,
            conversion,
        })
    }

    pub fn conversion(&self) -> Conversion {
        self.conversion
    }

    /// Append `value` rendered through the template to `out`.
    pub fn render_into(&self, value: i128, out: &mut String) {
        out.push_str(&self.prefix);

        let magnitude = value.unsigned_abs();
        let mut digits = match self.conversion {
            Conversion::Decimal => itoa::Buffer::new().format(magnitude).to_owned(),
            Conversion::LowerHex => format!("{magnitude:x}"),
            Conversion::UpperHex => format!("{magnitude:X}"),
            Conversion::Octal => format!("{magnitude:o}"),
            Conversion::Binary => format!("{magnitude:b}"),
            Conversion::Char => u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string(),
        };

        let numeric = self.conversion != Conversion::Char;
        if numeric {
            if let Some(p) = self.precision {
                if digits.len() < p {
                    digits.insert_str(0, &"0".repeat(p - digits.len()));
                }
            }
        }

        let sign = if !numeric {
            ""
        } else if value < 0 {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        };
        let radix_prefix = match self.conversion {
            _ if !self.flags.alternate || magnitude == 0 => "",
            Conversion::LowerHex => "0x",
            Conversion::UpperHex => "0X",
            Conversion::Octal => "0",
            Conversion::Binary => "0b",
            _ => "",
        };

        let body_len = sign.len() + radix_prefix.len() + digits.chars().count();
        let pad = self.width.saturating_sub(body_len);
        if self.flags.left {
            out.push_str(sign);
            out.push_str(radix_prefix);
            out.push_str(&digits);
            out.extend(std::iter::repeat(' ').take(pad));
        } else if self.flags.zero && numeric && self.precision.is_none() {
            out.push_str(sign);
            out.push_str(radix_prefix);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(&digits);
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(sign);
            out.push_str(radix_prefix);
            out.push_str(&digits);
        }

        out.push_str(&self.suffix);
    }

    pub fn render(&self, value: i128) -> String {
        let mut out = String::new();
        self.render_into(value, &mut out);
        out
    }
}

impl Default for FormatTemplate {
    /// Two-digit lowercase hex, `%02x`.
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            flags: Flags {
                zero: true,
                ..Flags::default()
            },
            width: 2,
            precision: None,
            conversion: Conversion::LowerHex,
        }
    }
}
