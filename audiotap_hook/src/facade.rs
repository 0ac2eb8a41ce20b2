//! The public façade (§4.1): `set_buffer`, `allow_skip`, `start`, `stop`,
//! `destroy`. `init` is [`AudioHook::new`] (see `registry.rs`).

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use audiotap_core::{HookError, Result};
use audiotap_transport::PacketTransport;

use crate::init::stream_init;
use crate::registry::AudioHook;

impl AudioHook {
    /// `set_buffer(hook, transport)`: one-shot; fails [`HookError::AlreadySet`]
    /// if a transport is already bound.
    pub fn set_buffer(&self, transport: Box<dyn PacketTransport>) -> Result<()> {
        self.transport
            .set(Arc::new(Mutex::new(transport)))
            .map_err(|_| HookError::AlreadySet)
    }

    /// `allow_skip(hook, bool)`: toggles the `allow-skip` flag.
    pub fn allow_skip(&self, enable: bool) {
        self.allow_skip.store(enable, Ordering::Release);
    }

    /// `start(hook)`: fails [`HookError::NotReady`] if no transport is
    /// bound. On the first call, initializes every pending stream with a
    /// valid format, then sets `capturing`. A second call while already
    /// capturing is a no-op (logged, not an error — invariant 6).
    pub fn start(&self) -> Result<()> {
        if self.transport.get().is_none() {
            return Err(HookError::NotReady);
        }

        if self.capturing.load(Ordering::Acquire) {
            log::warn!("start called while already capturing, ignoring");
            return Ok(());
        }

        if !self.started.swap(true, Ordering::AcqRel) {
            let pending: Vec<_> = self
                .streams
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.fmt_valid())
                .cloned()
                .collect();
            for stream in pending {
                stream_init(self, &stream)?;
            }
        }

        self.capturing.store(true, Ordering::Release);
        log::info!("capture started");
        Ok(())
    }

    /// `stop(hook)`: clears `capturing`. Streams and workers remain so a
    /// later `start` resumes without re-spawning threads.
    pub fn stop(&self) {
        self.capturing.store(false, Ordering::Release);
        log::info!("capture stopped");
    }

    /// `destroy(hook)`: tears down every stream's worker (if running),
    /// waiting for `finished`, then drops every stream. Semaphores, locks,
    /// and scratch buffers are released by Rust's ordinary `Drop` once the
    /// last `Arc<Stream>` reference goes away.
    pub fn destroy(&self) {
        let streams: Vec<_> = self.streams.lock().unwrap().drain().map(|(_, s)| s).collect();
        for stream in streams {
            if stream.capture_running() {
                stream.set_capture_running(false);
                stream.handoff.full.post();
                stream.handoff.finished.wait();
            }
            if let Some(handle) = stream.worker().take() {
                let _ = handle.join();
            }
        }
        log::info!("hook destroyed");
    }
}
