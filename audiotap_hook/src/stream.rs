//! Per-stream state (§3).

use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::{Mutex, MutexGuard};
use std::thread::JoinHandle;

use audiotap_core::{AudioFormat, ChannelArea, Handoff};

use crate::state::StateToken;

/// Opaque pointer-equality key standing in for a host `pcm_t*` handle.
///
/// `audiotap_hook` never dereferences this value, only compares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmId(pub usize);

/// Monotonically assigned stream identifier, used as `audio_id` in every
/// emitted packet. Zero until the stream's first successful `hw_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioId(pub u32);

bitflags::bitflags! {
    /// Mode bits the host library reports for a stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamMode: u32 {
        /// The producer entry points may be invoked from a signal handler.
        const ASYNC = 0x01;
        const NONBLOCK = 0x02;
    }
}

/// Negotiated access mode for a stream, resolved from `HostAccess` during
/// `hw_params` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Interleaved,
    NonInterleaved,
    /// MMap access with independent per-channel base/stride; normalized to
    /// interleaved on the fly (§4.8).
    Complex,
}

/// A stream's negotiated format, established by `hw_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub flags: AudioFormat,
    pub rate: u32,
    pub channels: u32,
    /// Bytes per sample, per channel — supplied by the host library's own
    /// `frames_to_bytes`/`samples_to_bytes` (out of scope here; see §6).
    pub sample_bytes: u32,
    pub access: Access,
}

impl NegotiatedFormat {
    pub fn frame_bytes(&self) -> u32 {
        self.sample_bytes * self.channels
    }

    pub fn samples_to_bytes(&self, frames: u32) -> u32 {
        self.sample_bytes * frames
    }

    pub fn frames_to_bytes(&self, frames: u32) -> u32 {
        self.frame_bytes() * frames
    }
}

/// Last MMap region observed via `mmap_begin`, valid until `mmap_commit`.
#[derive(Debug, Clone)]
pub struct MmapWindow {
    pub areas: Vec<ChannelArea>,
    pub offset: u64,
    pub frames: u32,
}

/// The capture-data scratch buffer: grown, never shrunk (§3).
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    data: Vec<u8>,
    size: usize,
    time: u64,
}

impl ScratchBuffer {
    /// Grows `data`'s capacity (not its logical size) to at least `bytes`,
    /// then sets the logical payload size to `bytes`.
    pub fn set_size(&mut self, bytes: usize) {
        if self.data.len() < bytes {
            self.data.resize(bytes, 0);
        }
        self.size = bytes;
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.size]
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }

    pub fn time(&self) -> u64 {
        self.time
    }
}

/// Tracks whether the current format epoch's `AUDIO_FORMAT` announcement
/// has already been sent, so `stream_init` can emit it exactly once per
/// epoch (§4.6).
#[derive(Debug, Default)]
pub struct PacketContext {
    pub format_sent: bool,
}

/// One per PCM handle the application has touched (§3).
#[derive(Debug)]
pub struct Stream {
    pub pcm: PcmId,
    mode: Mutex<StreamMode>,
    audio_id: AtomicU32,
    state_token: Mutex<Option<StateToken>>,
    format: Mutex<Option<NegotiatedFormat>>,
    fmt_valid: AtomicBool,
    initialized: AtomicBool,
    mmap: Mutex<Option<MmapWindow>>,
    scratch: Mutex<ScratchBuffer>,
    pub handoff: Handoff,
    capture_running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    packet: Mutex<PacketContext>,
}

impl Stream {
    pub fn new(pcm: PcmId, mode: StreamMode) -> Self {
        Self {
            pcm,
            mode: Mutex::new(mode),
            audio_id: AtomicU32::new(0),
            state_token: Mutex::new(None),
            format: Mutex::new(None),
            fmt_valid: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            mmap: Mutex::new(None),
            scratch: Mutex::new(ScratchBuffer::default()),
            handoff: Handoff::new(mode.contains(StreamMode::ASYNC)),
            capture_running: AtomicBool::new(false),
            worker: Mutex::new(None),
            packet: Mutex::new(PacketContext::default()),
        }
    }

    pub fn mode(&self) -> StreamMode {
        *self.mode.lock().unwrap()
    }

    pub fn set_mode(&self, mode: StreamMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn is_async(&self) -> bool {
        self.mode().contains(StreamMode::ASYNC)
    }

    pub fn audio_id(&self) -> AudioId {
        AudioId(self.audio_id.load(std::sync::atomic::Ordering::Acquire))
    }

    pub fn set_audio_id(&self, id: AudioId) {
        self.audio_id.store(id.0, std::sync::atomic::Ordering::Release);
    }

    pub fn state_token(&self) -> Option<StateToken> {
        *self.state_token.lock().unwrap()
    }

    pub fn set_state_token(&self, token: StateToken) {
        *self.state_token.lock().unwrap() = Some(token);
    }

    pub fn format(&self) -> MutexGuard<'_, Option<NegotiatedFormat>> {
        self.format.lock().unwrap()
    }

    pub fn fmt_valid(&self) -> bool {
        self.fmt_valid.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn set_fmt_valid(&self, valid: bool) {
        self.fmt_valid.store(valid, std::sync::atomic::Ordering::Release);
    }

    pub fn initialized(&self) -> bool {
        self.initialized.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn set_initialized(&self, value: bool) {
        self.initialized.store(value, std::sync::atomic::Ordering::Release);
    }

    pub fn mmap(&self) -> MutexGuard<'_, Option<MmapWindow>> {
        self.mmap.lock().unwrap()
    }

    pub fn scratch(&self) -> MutexGuard<'_, ScratchBuffer> {
        self.scratch.lock().unwrap()
    }

    pub fn capture_running(&self) -> bool {
        self.capture_running.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn set_capture_running(&self, value: bool) {
        self.capture_running.store(value, std::sync::atomic::Ordering::Release);
    }

    pub fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap()
    }

    pub fn packet(&self) -> MutexGuard<'_, PacketContext> {
        self.packet.lock().unwrap()
    }
}
