//! Binops: random access to binary records in files and pipes
//!
//! This library reads fixed and variable length binary records from any
//! input, seekable or not, and renders selected parts of each record.
//!
//! # Features
//!
//! - **Unified positional reads**: [`SeekablePipe`] forwards reads to files
//!   and transparently buffers pipes, sockets and other sequential inputs
//! - **Inclusive ranges**: `N`, `N..M`, open ends and negative indexes
//!   relative to the record end
//! - **Scalar directives**: pack-style letters (`C`, `S<`, `L>`, `q*`, ...)
//!   to decode and encode integers
//!
//! # Example
//!
//! ```rust
//! use binops::{parse_fields, SeekablePipe, Width};
//! use std::io::Cursor;
//!
//! let mut sp = SeekablePipe::new(Cursor::new(b"FOOBAR".to_vec()));
//! let ops = parse_fields("1,0").unwrap();
//! let mut out = Vec::new();
//! sp.each_record(Width::fixed(3).unwrap(), 0)
//!     .try_for_each(|record| record.scripted_write(&mut out, &ops).map(drop))
//!     .unwrap();
//! assert_eq!(out, b"OFAB");
//! ```

pub mod config;
pub mod directive;
pub mod error;
pub mod format;
pub mod input;
pub mod pattern;
pub mod range;
pub mod records;
pub mod source;
pub mod stream;
pub mod view;

// Re-export commonly used types
pub use directive::Directive;
pub use error::{BinopsError, Result};
pub use format::FormatTemplate;
pub use pattern::PatternSpec;
pub use range::{parse_positive_increasing_range, parse_range, ByteRange, PositiveIncreasingRange};
pub use records::{Filter, Limit, Vlen, Width};
pub use source::{Pread, Sequential};
pub use stream::SeekablePipe;
pub use view::{parse_fields, parse_unpack, RecordView, UnpackedRange, WriteOp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::input::{stdin_or_each, Input};
    pub use crate::records::{Filter, Limit, Vlen, Width};
    pub use crate::source::{Pread, Sequential};
    pub use crate::stream::SeekablePipe;
    pub use crate::view::{RecordView, WriteOp};
    pub use crate::{ByteRange, Directive, FormatTemplate};
}
