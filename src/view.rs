//! Addressable windows over a [`SeekablePipe`] and scripted output.
//!
//! A [`RecordView`] owns no bytes. It names a record by absolute offset and
//! (optional) length and reads sub-ranges through the stream on demand.
//! Record iteration reuses a single view, moving it with
//! [`RecordView::replace`]; slices it returns live only until the next read.
//! Use [`RecordView::to_vec`] to keep a record.

use crate::directive::Directive;
use crate::error::Result;
use crate::format::FormatTemplate;
use crate::range::{parse_range, ByteRange};
use crate::source::Pread;
use crate::stream::SeekablePipe;
use std::io::Write;

/// Separator between values rendered by one [`UnpackedRange`].
pub const UNPACK_SEPARATOR: &str = " ";

/// Usage string for `-u` style tokens.
pub const UNPACK_SYNTAX: &str = "N,N..M,...[:DIRECTIVE=C*][?FORMAT=%02x]";

/// A range of bytes decoded into scalars, each rendered through a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedRange {
    pub range: ByteRange,
    pub directive: Directive,
    pub format: FormatTemplate,
}

impl UnpackedRange {
    /// Every byte as two-digit hex.
    pub fn new(range: ByteRange) -> Self {
        Self {
            range,
            directive: Directive::BYTES,
            format: FormatTemplate::default(),
        }
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = directive;
        self
    }

    pub fn with_format(mut self, format: FormatTemplate) -> Self {
        self.format = format;
        self
    }
}

/// One step of a write script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Bytes copied verbatim.
    Literal(Vec<u8>),
    /// Raw bytes of a record range.
    CopyRange(ByteRange),
    /// Decoded and formatted record range.
    Unpacked(UnpackedRange),
}

/// Parse `N,N..M,...` into [`WriteOp::CopyRange`] steps.
pub fn parse_fields(token: &str) -> Result<Vec<WriteOp>> {
    token
        .split(',')
        .map(|f| parse_range(f).map(WriteOp::CopyRange))
        .collect()
}

/// Parse `N,N..M,...[:DIRECTIVE][?FORMAT]` into [`WriteOp::Unpacked`] steps
/// sharing one directive and template.
pub fn parse_unpack(token: &str) -> Result<Vec<WriteOp>> {
    let (fields_directive, format) = match token.split_once('?') {
        Some((fd, f)) => (fd, FormatTemplate::parse(f)?),
        None => (token, FormatTemplate::default()),
    };
    let (fields, directive) = match fields_directive.split_once(':') {
        Some((fields, d)) => (fields, Directive::parse(d)?),
        None => (fields_directive, Directive::BYTES),
    };
    fields
        .split(',')
        .map(|f| {
            let range = parse_range(f)?;
            Ok(WriteOp::Unpacked(
                UnpackedRange::new(range)
                    .with_directive(directive)
                    .with_format(format.clone()),
            ))
        })
        .collect()
}

/// A window `offset..offset+length` into a stream.
#[derive(Debug)]
pub struct RecordView<'a, S> {
    stream: &'a mut SeekablePipe<S>,
    offset: u64,
    length: Option<u64>,
}

impl<'a, S: Pread> RecordView<'a, S> {
    /// `length` of None leaves the view unbounded; negative indexes then
    /// fail to resolve.
    pub fn new(stream: &'a mut SeekablePipe<S>, offset: u64, length: Option<u64>) -> Self {
        Self {
            stream,
            offset,
            length,
        }
    }

    /// Point the view at another part of the stream.
    pub fn replace(&mut self, offset: u64, length: Option<u64>) {
        self.offset = offset;
        self.length = length;
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn stream(&mut self) -> &mut SeekablePipe<S> {
        &mut *self.stream
    }

    /// Read `range`, relative to the record start.
    ///
    /// Ranges past the end of a record of known length give an empty slice
    /// and ranges running over its end are truncated. None means the stream
    /// has no data at the resolved position.
    pub fn get(&mut self, range: ByteRange) -> Result<Option<&[u8]>> {
        let span = range.resolve(self.length)?;
        if span.is_empty() {
            return Ok(Some(&[]));
        }
        let maxlen = usize::try_from(span.len).unwrap_or(usize::MAX);
        self.stream.pread(maxlen, self.offset.saturating_add(span.from))
    }

    /// Copy the whole record out of the stream.
    pub fn to_vec(&mut self) -> Result<Vec<u8>> {
        Ok(self.get(ByteRange::all())?.map(<[u8]>::to_vec).unwrap_or_default())
    }

    /// Execute `ops` in order against this record, writing to `sink`.
    ///
    /// Stops at the first range op with no data behind it and returns false;
    /// returns true when every op ran.
    pub fn scripted_write<W: Write + ?Sized>(&mut self, sink: &mut W, ops: &[WriteOp]) -> Result<bool> {
        let mut values = Vec::new();
        let mut text = String::new();
        for op in ops {
            match op {
                WriteOp::Literal(bytes) => sink.write_all(bytes)?,
                WriteOp::CopyRange(range) => match self.get(*range)? {
                    Some(bytes) => sink.write_all(bytes)?,
                    None => return Ok(false),
                },
                WriteOp::Unpacked(unpacked) => {
                    let Some(bytes) = self.get(unpacked.range)? else {
                        return Ok(false);
                    };
                    values.clear();
                    unpacked.directive.decode_into(bytes, &mut values);
                    text.clear();
                    for (i, &value) in values.iter().enumerate() {
                        if i > 0 {
                            text.push_str(UNPACK_SEPARATOR);
                        }
                        unpacked.format.render_into(value, &mut text);
                    }
                    sink.write_all(text.as_bytes())?;
                }
            }
        }
        Ok(true)
    }
}
