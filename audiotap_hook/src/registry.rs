//! The Hook singleton and its stream registry (§3, §4.2).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use audiotap_core::Clock;
use audiotap_transport::PacketTransport;

use crate::state::StateRegistry;
use crate::stream::{PcmId, Stream, StreamMode};

/// Per-process capture hook. Owns the stream registry, the bound downstream
/// transport, and the global `capturing`/`allow-skip`/`started` flags (§3).
///
/// Rust construction replaces the explicit `init` call of the original
/// design; a caller keeps one instance alive for the hook's lifetime.
pub struct AudioHook {
    pub(crate) streams: Mutex<HashMap<PcmId, Arc<Stream>>>,
    /// One-shot: `set_buffer` fails `AlreadySet` once this is populated.
    pub(crate) transport: OnceLock<Arc<Mutex<Box<dyn PacketTransport>>>>,
    pub(crate) capturing: AtomicBool,
    pub(crate) allow_skip: AtomicBool,
    pub(crate) started: AtomicBool,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) state_registry: Arc<dyn StateRegistry>,
}

impl AudioHook {
    /// The Rust equivalent of `audio_hook_init`: allocate and bind the
    /// clock/state subsystem. No transport is bound yet — see
    /// [`AudioHook::set_buffer`].
    pub fn new(clock: Arc<dyn Clock>, state_registry: Arc<dyn StateRegistry>) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            transport: OnceLock::new(),
            capturing: AtomicBool::new(false),
            allow_skip: AtomicBool::new(false),
            started: AtomicBool::new(false),
            clock,
            state_registry,
        }
    }

    /// `get_stream` (§4.2): find the stream for `pcm`, or allocate and
    /// register one if this is the first sighting of this handle.
    pub fn get_or_create_stream(&self, pcm: PcmId, mode: StreamMode) -> Arc<Stream> {
        let mut streams = self.streams.lock().unwrap();
        Arc::clone(streams.entry(pcm).or_insert_with(|| Arc::new(Stream::new(pcm, mode))))
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub fn is_allow_skip(&self) -> bool {
        self.allow_skip.load(Ordering::Acquire)
    }
}
