//! Buffer sizing for streams and output.
//!
//! These values control memory usage vs I/O throughput tradeoffs. Buffers
//! grow on demand, so the capacities only decide how much is reserved up
//! front.

/// Default capacity of the reused decode buffer (64 KB).
pub const DEFAULT_SCRATCH_CAPACITY: usize = 64 * 1024;

/// Low-memory decode buffer capacity (4 KB).
pub const LOW_MEMORY_SCRATCH_CAPACITY: usize = 4 * 1024;

/// Default initial capacity of the pipe emulation buffer (256 KB).
/// Enough to hold a few typical records read from a pipe.
pub const DEFAULT_PIPE_CAPACITY: usize = 256 * 1024;

/// Low-memory pipe emulation buffer capacity (16 KB).
pub const LOW_MEMORY_PIPE_CAPACITY: usize = 16 * 1024;

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Low-memory output buffer size (256 KB).
pub const LOW_MEMORY_OUTPUT_BUFFER: usize = 256 * 1024;

/// Returns the appropriate output buffer size based on low_memory flag.
#[inline]
pub const fn output_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_OUTPUT_BUFFER
    } else {
        DEFAULT_OUTPUT_BUFFER
    }
}

/// Initial buffer capacities for a [`crate::SeekablePipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub scratch_capacity: usize,
    pub pipe_capacity: usize,
}

impl StreamConfig {
    pub const fn low_memory() -> Self {
        Self {
            scratch_capacity: LOW_MEMORY_SCRATCH_CAPACITY,
            pipe_capacity: LOW_MEMORY_PIPE_CAPACITY,
        }
    }

    pub const fn for_memory(low_memory: bool) -> Self {
        if low_memory {
            Self::low_memory()
        } else {
            Self {
                scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
                pipe_capacity: DEFAULT_PIPE_CAPACITY,
            }
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::for_memory(false)
    }
}
