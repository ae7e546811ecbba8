//! Unified positional reads over files and pipes.
//!
//! [`SeekablePipe`] starts in direct mode, forwarding reads to the source's
//! positional read. The first time the source answers "not seekable" it
//! switches, permanently, to buffered mode: bytes are pulled sequentially
//! into a buffer whose first byte sits at the discard watermark, so reads
//! may go backwards as far as the watermark. [`SeekablePipe::discard`]
//! releases everything buffered and moves the watermark to the current end
//! of the buffer.

use crate::config::StreamConfig;
use crate::error::{BinopsError, Result};
use crate::source::{Pread, Positional};
use std::io::Read;
use tracing::{debug, trace};

/// Smallest step by which a positional read grows the scratch buffer.
const MIN_READ_CHUNK: usize = 4 * 1024;

#[derive(Debug)]
enum Mode {
    Direct,
    Buffered { buffer: Vec<u8>, watermark: u64 },
}

/// A file/pipe wrapper that supports a unified pread operation.
#[derive(Debug)]
pub struct SeekablePipe<S> {
    source: S,
    scratch: Vec<u8>,
    mode: Mode,
    eof: bool,
    config: StreamConfig,
}

impl<S: Pread> SeekablePipe<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, StreamConfig::default())
    }

    pub fn with_config(source: S, config: StreamConfig) -> Self {
        Self {
            source,
            scratch: Vec::with_capacity(config.scratch_capacity),
            mode: Mode::Direct,
            eof: false,
            config,
        }
    }

    /// Read up to `maxlen` bytes starting at absolute `offset`.
    ///
    /// Returns None if there is no data at `offset` (end of data), otherwise
    /// a slice that is shorter than `maxlen` only when the data ran out. The
    /// slice borrows an internal buffer that the next read reuses. Any short
    /// read sets [`SeekablePipe::is_eof`].
    ///
    /// In buffered mode, reading below the discard watermark is a
    /// [`BinopsError::BelowWatermark`] error.
    pub fn pread(&mut self, maxlen: usize, offset: u64) -> Result<Option<&[u8]>> {
        if matches!(self.mode, Mode::Direct) {
            match self.direct_read(maxlen, offset)? {
                Some(n) => {
                    return Ok(self.finish(maxlen, n).then(|| &self.scratch[..n]));
                }
                None => {
                    debug!(offset, "source is not seekable, buffering sequential reads");
                    self.mode = Mode::Buffered {
                        buffer: Vec::with_capacity(self.config.pipe_capacity),
                        watermark: 0,
                    };
                }
            }
        }
        self.buffered_read(maxlen, offset)
    }

    /// Like [`SeekablePipe::pread`] but appends to a caller-owned buffer.
    ///
    /// Returns the number of bytes appended, or None at end of data.
    pub fn pread_into(&mut self, maxlen: usize, offset: u64, out: &mut Vec<u8>) -> Result<Option<usize>> {
        Ok(self.pread(maxlen, offset)?.map(|bytes| {
            out.extend_from_slice(bytes);
            bytes.len()
        }))
    }

    /// Positional read into the scratch buffer. None if the source turned
    /// out not to be seekable.
    ///
    /// The scratch buffer grows with the data actually read, so a record
    /// whose declared length runs far past the end of the source costs no
    /// more memory than the bytes that exist.
    fn direct_read(&mut self, maxlen: usize, offset: u64) -> Result<Option<usize>> {
        let chunk = self.config.scratch_capacity.max(MIN_READ_CHUNK);
        self.scratch.clear();
        let mut filled = 0;
        while filled < maxlen {
            let step = (maxlen - filled).min(filled.max(chunk));
            self.scratch.resize(filled + step, 0);
            let at = offset.saturating_add(filled as u64);
            match self.source.pread(&mut self.scratch[filled..filled + step], at) {
                Ok(Positional::Read(0)) => break,
                Ok(Positional::Read(n)) => filled += n,
                Ok(Positional::NotSeekable) => return Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.scratch.truncate(filled);
        Ok(Some(filled))
    }

    fn buffered_read(&mut self, maxlen: usize, offset: u64) -> Result<Option<&[u8]>> {
        let Mode::Buffered { buffer, watermark } = &mut self.mode else {
            unreachable!("buffered_read in direct mode");
        };
        if offset < *watermark {
            return Err(BinopsError::BelowWatermark {
                offset,
                watermark: *watermark,
            });
        }

        let from = usize::try_from(offset - *watermark).unwrap_or(usize::MAX);
        let to = from.saturating_add(maxlen);
        if buffer.len() < to {
            let need = (to - buffer.len()) as u64;
            self.source.by_ref().take(need).read_to_end(buffer)?;
        }

        let end = to.min(buffer.len());
        let n = end.saturating_sub(from);
        if n < maxlen {
            self.eof = true;
        }
        if n == 0 && maxlen > 0 {
            return Ok(None);
        }
        Ok(Some(&buffer[from.min(end)..end]))
    }

    /// Record a short read; false if nothing was available at all.
    fn finish(&mut self, maxlen: usize, n: usize) -> bool {
        if n < maxlen {
            self.eof = true;
        }
        n > 0 || maxlen == 0
    }

    /// Release all buffered bytes below the current read position.
    ///
    /// A no-op for seekable sources. Reads below the new watermark fail
    /// afterwards.
    pub fn discard(&mut self) {
        if let Mode::Buffered { buffer, watermark } = &mut self.mode {
            if !buffer.is_empty() {
                trace!(released = buffer.len(), watermark = *watermark, "discarding pipe buffer");
            }
            *watermark += buffer.len() as u64;
            buffer.clear();
        }
    }

    /// True once a read returned fewer bytes than requested, until
    /// [`SeekablePipe::clear_eof`].
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Forget earlier short reads so [`SeekablePipe::is_eof`] only reports
    /// reads made from here on.
    pub fn clear_eof(&mut self) {
        self.eof = false;
    }

    /// True once the stream has fallen back to sequential reads.
    pub fn is_buffered(&self) -> bool {
        matches!(self.mode, Mode::Buffered { .. })
    }

    /// Lowest absolute offset still readable, None in direct mode.
    pub fn watermark(&self) -> Option<u64> {
        match &self.mode {
            Mode::Direct => None,
            Mode::Buffered { watermark, .. } => Some(*watermark),
        }
    }

    /// Bytes currently held by the pipe emulation buffer.
    pub fn buffered_len(&self) -> usize {
        match &self.mode {
            Mode::Direct => 0,
            Mode::Buffered { buffer, .. } => buffer.len(),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
