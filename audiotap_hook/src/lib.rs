//! # audiotap_hook
//!
//! The capture pipeline's CORE: a component that sits between an
//! application and a host audio library, observing every buffer the
//! application submits and forwarding a time-stamped copy into a downstream
//! packet transport.
//!
//! An [`AudioHook`] owns a registry of [`Stream`]s, one per PCM handle the
//! application has touched. The producer entry points in [`producer`]
//! (`open`, `close`, `hw_params`, `writei`, `writen`, `mmap_begin`,
//! `mmap_commit`) are invoked from the application's audio submission path;
//! each stream's [`worker`] thread drains its scratch buffer and frames
//! packets into the [`audiotap_transport::PacketTransport`] bound via
//! [`AudioHook::set_buffer`].
//!
//! The mechanism that installs these entry points against a real host
//! audio library (symbol interposition or otherwise) is out of scope —
//! this crate models everything downstream of that boundary.

pub mod facade;
pub mod init;
pub mod producer;
pub mod registry;
pub mod state;
pub mod stream;
pub mod worker;

pub use audiotap_core::{HookError, Result};
pub use producer::HwParams;
pub use registry::AudioHook;
pub use state::{AtomicStateRegistry, IssuedState, StateRegistry, StateToken};
pub use stream::{Access, AudioId, NegotiatedFormat, PcmId, Stream, StreamMode};

#[cfg(test)]
mod tests;
