//! Positional-read capability for record sources.
//!
//! A [`Pread`] source either reads at an absolute offset without moving any
//! other read position, or answers [`Positional::NotSeekable`]. Every source
//! is also [`Read`] so that a non-seekable one can be consumed sequentially.

use std::fs::File;
use std::io::{self, Cursor, Read};

/// Outcome of a positional read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positional {
    /// Number of bytes placed at the start of the buffer; 0 at end of data.
    Read(usize),
    /// The source cannot seek; callers should fall back to sequential reads.
    NotSeekable,
}

/// Sources that support (or explicitly refuse) positional reads.
pub trait Pread: Read {
    /// Read up to `buf.len()` bytes at `offset`.
    ///
    /// May return fewer bytes than requested before end of data, like
    /// [`Read::read`].
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional>;
}

impl<P: Pread + ?Sized> Pread for Box<P> {
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional> {
        (**self).pread(buf, offset)
    }
}

impl<P: Pread + ?Sized> Pread for &mut P {
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional> {
        (**self).pread(buf, offset)
    }
}

fn not_seekable(result: io::Result<usize>) -> io::Result<Positional> {
    match result {
        Ok(n) => Ok(Positional::Read(n)),
        Err(e) if e.kind() == io::ErrorKind::NotSeekable => Ok(Positional::NotSeekable),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
impl Pread for File {
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional> {
        use std::os::unix::fs::FileExt;
        if offset > i64::MAX as u64 {
            return Ok(Positional::Read(0));
        }
        not_seekable(self.read_at(buf, offset))
    }
}

#[cfg(windows)]
impl Pread for File {
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional> {
        use std::os::windows::fs::FileExt;
        if offset > i64::MAX as u64 {
            return Ok(Positional::Read(0));
        }
        // seek_read moves the file cursor, which only matters for sequential
        // reads and those happen after the switch away from positional ones.
        not_seekable(self.seek_read(buf, offset))
    }
}

/// In-memory bytes are always seekable.
impl<T: AsRef<[u8]>> Pread for Cursor<T> {
    fn pread(&mut self, buf: &mut [u8], offset: u64) -> io::Result<Positional> {
        let data = self.get_ref().as_ref();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(Positional::Read(n))
    }
}

/// Wraps a plain reader (stdin, a socket, a decoder) as a never-seekable
/// source.
#[derive(Debug)]
pub struct Sequential<R> {
    inner: R,
}

impl<R: Read> Sequential<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> Pread for Sequential<R> {
    fn pread(&mut self, _buf: &mut [u8], _offset: u64) -> io::Result<Positional> {
        Ok(Positional::NotSeekable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cursor_pread() {
        let mut src = Cursor::new(b"FOOBAR".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(src.pread(&mut buf, 2).unwrap(), Positional::Read(4));
        assert_eq!(&buf, b"OBAR");
        assert_eq!(src.pread(&mut buf, 5).unwrap(), Positional::Read(1));
        assert_eq!(src.pread(&mut buf, 9).unwrap(), Positional::Read(0));
        // positional reads leave the sequential cursor alone
        let mut rest = String::new();
        src.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "FOOBAR");
    }

    #[test]
    fn test_sequential_refuses() {
        let mut src = Sequential::new(&b"FOO"[..]);
        let mut buf = [0u8; 3];
        assert_eq!(src.pread(&mut buf, 0).unwrap(), Positional::NotSeekable);
        assert_eq!(src.read(&mut buf).unwrap(), 3);
    }

    #[test]
    fn test_file_pread() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"FOOBAR").unwrap();
        tmp.flush().unwrap();
        let mut file = tmp.reopen().unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(file.pread(&mut buf, 3).unwrap(), Positional::Read(3));
        assert_eq!(&buf, b"BAR");
        assert_eq!(file.pread(&mut buf, 6).unwrap(), Positional::Read(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_is_not_seekable() {
        use std::os::fd::OwnedFd;
        use std::os::unix::net::UnixStream;

        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(b"FOO").unwrap();
        drop(tx);
        let mut file = File::from(OwnedFd::from(rx));
        let mut buf = [0u8; 3];
        assert_eq!(file.pread(&mut buf, 0).unwrap(), Positional::NotSeekable);
        assert_eq!(file.read(&mut buf).unwrap(), 3);
    }
}
