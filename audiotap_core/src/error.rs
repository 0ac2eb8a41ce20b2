//! Error type shared by every crate in the audiotap workspace.

use std::fmt;

/// Error kinds produced by the capture pipeline.
///
/// Mirrors the error kinds a producer entry point can return: every
/// producer call returns the *first* error it hits and still releases its
/// write lock on every exit path (see `audiotap_hook`'s producer module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The downstream transport was already bound; `set_buffer` is one-shot.
    AlreadySet,
    /// `start` was called before a transport was bound.
    NotReady,
    /// The producer entry point was invoked on an uninitialized stream, or
    /// `mmap_commit` was called without a preceding `mmap_begin`, or a
    /// non-interleaved write landed on an interleaved stream.
    Invalid,
    /// The host format or access mode has no mapping to an emitted format.
    NotSupported,
    /// An async-mode producer could not enqueue: the worker was still
    /// draining the previous slot and `allow-skip` was set. The frame was
    /// dropped.
    Busy,
    /// Growing the scratch buffer failed.
    ///
    /// `ScratchBuffer` grows via `Vec::resize`, which aborts the process on
    /// allocation failure rather than returning an error, so this variant is
    /// never constructed on the allocators Rust targets today. Kept for
    /// parity with the original design's error set and for a caller that
    /// swaps in a fallible-allocation scratch buffer.
    OutOfMemory,
    /// The host audio library returned a negative status during `hw_params`
    /// extraction. The message is the host library's own description.
    HostError(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::AlreadySet => write!(f, "downstream transport already set"),
            HookError::NotReady => write!(f, "no transport bound, call set_buffer first"),
            HookError::Invalid => write!(f, "invalid operation for current stream state"),
            HookError::NotSupported => write!(f, "unsupported format or access mode"),
            HookError::Busy => write!(f, "capture worker not ready, frame dropped"),
            HookError::OutOfMemory => write!(f, "failed to grow scratch buffer"),
            HookError::HostError(msg) => write!(f, "host audio library error: {msg}"),
        }
    }
}

impl std::error::Error for HookError {}

/// Result type alias used throughout the audiotap workspace.
pub type Result<T> = std::result::Result<T, HookError>;
