//! # audiotap_core
//!
//! Foundational mechanisms shared across the audiotap workspace: the
//! lock-free SPSC ring buffer used to hand closed packets to the downstream
//! transport, mmap channel-area address arithmetic and complex-to-interleaved
//! conversion, the producer/worker rendezvous primitives, sample format
//! mapping, a monotonic timestamp source, and the crate-wide error type.
//!
//! The real host audio library (ALSA or otherwise) and the mechanism that
//! installs this pipeline inside an application's process are both out of
//! scope; this crate and its siblings model everything downstream of that
//! boundary.

pub mod clock;
pub mod error;
pub mod format;
pub mod mmap;
pub mod rendezvous;
pub mod spsc;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{HookError, Result};
pub use format::{map_format, AudioFormat, HostAccess, HostFormat};
pub use mmap::{copy_from_area, deinterleave_complex, ChannelArea};
pub use rendezvous::{Handoff, Semaphore, Spinlock, SpinlockGuard, WriteLock, WriteLockGuard};
pub use spsc::{Consumer, Producer, SpscRingBuffer};
