//! Record iteration over a [`SeekablePipe`].
//!
//! Records are either a fixed number of bytes wide or carry their own
//! length in a header field ([`Vlen`]). Iteration is forward-only and lends
//! one reused [`RecordView`] per step:
//!
//! ```
//! use binops::{SeekablePipe, Width};
//! use std::io::Cursor;
//!
//! let mut sp = SeekablePipe::new(Cursor::new(b"FOOBAR".to_vec()));
//! let mut records = sp.each_record(Width::fixed(2).unwrap(), 1);
//! let mut seen = Vec::new();
//! while let Some(record) = records.next_record().unwrap() {
//!     seen.push(record.to_vec().unwrap());
//! }
//! assert_eq!(seen, vec![b"OO".to_vec(), b"BA".to_vec(), b"R".to_vec()]);
//! ```

use crate::directive::Directive;
use crate::error::{BinopsError, Result};
use crate::range::{parse_integer, parse_positive_increasing_range, parse_range, ByteRange, PositiveIncreasingRange};
use crate::source::Pread;
use crate::stream::SeekablePipe;
use crate::view::RecordView;
use std::fmt;
use tracing::debug;

/// Usage string for variable-length record tokens.
pub const VLEN_SYNTAX: &str = "N..M[:DIRECTIVE=C]+EXTRA_BYTES";

/// Usage string for filter tokens.
pub const FILTER_SYNTAX: &str = "N..M[:DIRECTIVE=C][&HEXMASK]{==,!=,<,<=,>,>=}INTEGER";

/// Variable-length record descriptor: where the length field sits in the
/// record header, how to decode it and how many bytes the encoded length
/// leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vlen {
    pub range: PositiveIncreasingRange,
    pub directive: Directive,
    pub extra_bytes: i64,
}

impl Vlen {
    pub fn new(range: PositiveIncreasingRange, directive: Directive, extra_bytes: i64) -> Self {
        Self {
            range,
            directive,
            extra_bytes,
        }
    }

    /// Parse `RANGE[:DIRECTIVE]+EXTRA_BYTES`, e.g. `"1:C+2"` or `"4..7:L>+8"`.
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |message: &str| BinopsError::InvalidVlen {
            token: token.to_string(),
            message: message.to_string(),
        };
        let (head, extra) = token
            .rsplit_once('+')
            .ok_or_else(|| invalid("missing +EXTRA_BYTES"))?;
        let extra_bytes = parse_integer(extra)
            .and_then(|n| i64::try_from(n).ok())
            .ok_or_else(|| invalid("extra bytes is not a number"))?;
        let (range, directive) = match head.split_once(':') {
            Some((range, d)) => (range, Directive::parse(d)?),
            None => (head, Directive::BYTE),
        };
        Ok(Self::new(
            parse_positive_increasing_range(range)?,
            directive,
            extra_bytes,
        ))
    }

    /// Read the header of the record at `offset` and compute its length.
    ///
    /// None when the header is missing or too short to decode, which ends
    /// iteration.
    fn record_length<S: Pread>(&self, stream: &mut SeekablePipe<S>, offset: u64) -> Result<Option<u64>> {
        let width = self.range.width() as usize;
        let Some(header) = stream.pread(width, offset.saturating_add(self.range.first()))? else {
            return Ok(None);
        };
        let Some(value) = self.directive.decode_first(header) else {
            return Ok(None);
        };
        let length = value + self.extra_bytes as i128;
        if length <= 0 {
            return Err(BinopsError::RecordLength { offset, length });
        }
        Ok(Some(u64::try_from(length).unwrap_or(u64::MAX)))
    }
}

/// How long each record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Fixed(u64),
    Variable(Vlen),
}

impl Width {
    pub fn fixed(width: u64) -> Result<Self> {
        if width == 0 {
            return Err(BinopsError::InvalidWidth(width));
        }
        Ok(Width::Fixed(width))
    }
}

impl From<Vlen> for Width {
    fn from(vlen: Vlen) -> Self {
        Width::Variable(vlen)
    }
}

/// Integer comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn apply(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Ne => lhs != rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select records whose (masked) integer field compares true against an
/// operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub range: ByteRange,
    pub directive: Directive,
    pub mask: Option<u64>,
    pub comparator: Comparator,
    pub operand: i128,
}

impl Filter {
    pub fn new(range: ByteRange, comparator: Comparator, operand: i128) -> Self {
        Self {
            range,
            directive: Directive::BYTE,
            mask: None,
            comparator,
            operand,
        }
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = directive;
        self
    }

    pub fn with_mask(mut self, mask: u64) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Parse `RANGE[:DIRECTIVE][&HEXMASK] CMP INTEGER`, e.g. `"0&10==0x10"`
    /// or `"3..4:S< >= 0x8483"`.
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = |message: &str| BinopsError::InvalidFilter {
            token: token.to_string(),
            message: message.to_string(),
        };

        // Directives may end in '<' or '>', so the comparator is taken as
        // the longest operator ending at the last operator character.
        let op_end = token
            .rfind(['=', '!', '<', '>'])
            .map(|i| i + 1)
            .ok_or_else(|| invalid("missing comparator"))?;
        let head = &token[..op_end];
        let (comparator, op_len) = [
            ("==", Comparator::Eq),
            ("!=", Comparator::Ne),
            ("<=", Comparator::Le),
            (">=", Comparator::Ge),
            ("<", Comparator::Lt),
            (">", Comparator::Gt),
        ]
        .into_iter()
        .find(|(op, _)| head.ends_with(op))
        .map(|(op, c)| (c, op.len()))
        .ok_or_else(|| invalid("unknown comparator"))?;

        let operand = parse_integer(token[op_end..].trim())
            .ok_or_else(|| invalid("operand is not a number"))?;

        let field = head[..op_end - op_len].trim();
        let (field, mask) = match field.rsplit_once('&') {
            Some((field, mask)) => {
                let digits = mask
                    .strip_prefix("0x")
                    .or_else(|| mask.strip_prefix("0X"))
                    .unwrap_or(mask);
                let mask = u64::from_str_radix(digits, 16)
                    .ok()
                    .filter(|_| !digits.starts_with(['+', '-']))
                    .ok_or_else(|| invalid("mask is not hexadecimal"))?;
                (field, Some(mask))
            }
            None => (field, None),
        };
        let (range, directive) = match field.split_once(':') {
            Some((range, d)) => (range, Directive::parse(d)?),
            None => (field, Directive::BYTE),
        };

        Ok(Self {
            range: parse_range(range)?,
            directive,
            mask,
            comparator,
            operand,
        })
    }

    /// Decode the filter's field from `view` and compare it.
    ///
    /// A field the record is too short to hold does not match.
    pub fn matches<S: Pread>(&self, view: &mut RecordView<'_, S>) -> Result<bool> {
        let Some(bytes) = view.get(self.range)? else {
            return Ok(false);
        };
        let Some(mut value) = self.directive.decode_first(bytes) else {
            return Ok(false);
        };
        if let Some(mask) = self.mask {
            value &= mask as i128;
        }
        Ok(self.comparator.apply(value, self.operand))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.range, self.directive)?;
        if let Some(mask) = self.mask {
            write!(f, "&{mask:x}")?;
        }
        write!(f, "{}{}", self.comparator, self.operand)
    }
}

/// Upper bound on records yielded, shared by every source of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limit {
    remaining: Option<u64>,
}

impl Limit {
    pub fn new(count: Option<u64>) -> Self {
        Self { remaining: count }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    fn take_one(&mut self) {
        if let Some(n) = &mut self.remaining {
            *n = n.saturating_sub(1);
        }
    }
}

/// Lending cursor over the records of one stream.
///
/// Each successful [`Records::next_record`] repositions the same view; the
/// previous record's bytes may already be released from a pipe.
#[derive(Debug)]
pub struct Records<'a, S> {
    view: RecordView<'a, S>,
    width: Width,
    next_offset: u64,
    yielded: u64,
    done: bool,
}

impl<'a, S: Pread> Records<'a, S> {
    fn new(stream: &'a mut SeekablePipe<S>, width: Width, initial_offset: u64) -> Self {
        Self {
            view: RecordView::new(stream, initial_offset, None),
            width,
            next_offset: initial_offset,
            yielded: 0,
            done: false,
        }
    }

    fn finish(&mut self, reason: &str) {
        debug!(records = self.yielded, offset = self.next_offset, reason, "record iteration finished");
        self.done = true;
    }

    /// Move the view to the next record. False once the data is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let stream = self.view.stream();
        if self.yielded > 0 && stream.is_eof() {
            self.finish("short read in previous record");
            return Ok(false);
        }
        stream.clear_eof();
        stream.discard();

        let offset = self.next_offset;
        let length = match self.width {
            Width::Fixed(width) => width,
            Width::Variable(vlen) => match vlen.record_length(stream, offset)? {
                Some(length) => length,
                None => {
                    self.finish("no record header");
                    return Ok(false);
                }
            },
        };
        if stream.pread(1, offset)?.is_none() {
            self.finish("end of data");
            return Ok(false);
        }

        self.view.replace(offset, Some(length));
        self.next_offset = offset.saturating_add(length);
        self.yielded += 1;
        Ok(true)
    }

    /// The record the cursor was last moved to.
    pub fn current(&mut self) -> &mut RecordView<'a, S> {
        &mut self.view
    }

    pub fn next_record(&mut self) -> Result<Option<&mut RecordView<'a, S>>> {
        if self.advance()? {
            Ok(Some(&mut self.view))
        } else {
            Ok(None)
        }
    }

    /// Number of records yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Call `f` on every remaining record; returns how many were visited.
    pub fn try_for_each<F>(mut self, mut f: F) -> Result<u64>
    where
        F: FnMut(&mut RecordView<'a, S>) -> Result<()>,
    {
        let start = self.yielded;
        while self.advance()? {
            f(&mut self.view)?;
        }
        Ok(self.yielded - start)
    }
}

/// Lending cursor over the records that match at least one filter.
#[derive(Debug)]
pub struct FilteredRecords<'a, 'f, S> {
    records: Records<'a, S>,
    filters: &'f [Filter],
    limit: &'f mut Limit,
}

impl<'a, 'f, S: Pread> FilteredRecords<'a, 'f, S> {
    fn accept(&mut self) -> Result<bool> {
        if self.filters.is_empty() {
            return Ok(true);
        }
        let view = self.records.current();
        for filter in self.filters {
            if filter.matches(view)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Move to the next accepted record. False once the data or the limit
    /// is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        loop {
            if self.limit.is_exhausted() {
                return Ok(false);
            }
            if !self.records.advance()? {
                return Ok(false);
            }
            if self.accept()? {
                self.limit.take_one();
                return Ok(true);
            }
        }
    }

    pub fn current(&mut self) -> &mut RecordView<'a, S> {
        self.records.current()
    }

    pub fn next_record(&mut self) -> Result<Option<&mut RecordView<'a, S>>> {
        if self.advance()? {
            Ok(Some(self.records.current()))
        } else {
            Ok(None)
        }
    }

    /// Call `f` on every remaining accepted record; returns how many.
    pub fn try_for_each<F>(mut self, mut f: F) -> Result<u64>
    where
        F: FnMut(&mut RecordView<'a, S>) -> Result<()>,
    {
        let mut n = 0;
        while self.advance()? {
            f(self.records.current())?;
            n += 1;
        }
        Ok(n)
    }
}

impl<S: Pread> SeekablePipe<S> {
    /// Iterate records of `width` starting at `initial_offset`.
    ///
    /// A final record shorter than its declared width is still yielded, once.
    /// Against a pipe the iteration cannot be restarted: every step releases
    /// the previous record's bytes.
    pub fn each_record(&mut self, width: Width, initial_offset: u64) -> Records<'_, S> {
        Records::new(self, width, initial_offset)
    }

    /// Like [`SeekablePipe::each_record`] but only yields records matching
    /// any of `filters` (all records if there are none), and at most as many
    /// as `limit` still allows. The same `limit` should be passed for every
    /// source of a run.
    pub fn each_record_filtered<'a, 'f>(
        &'a mut self,
        width: Width,
        initial_offset: u64,
        filters: &'f [Filter],
        limit: &'f mut Limit,
    ) -> FilteredRecords<'a, 'f, S> {
        FilteredRecords {
            records: Records::new(self, width, initial_offset),
            filters,
            limit,
        }
    }
}
