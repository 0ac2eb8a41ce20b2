//! Stream (re)initialization (§4.6): binds a newly negotiated format to a
//! fresh worker generation and packet context.

use std::sync::Arc;

use audiotap_core::{HookError, Result};
use audiotap_transport::AudioFormatMessage;

use crate::registry::AudioHook;
use crate::stream::{PacketContext, Stream};
use crate::worker::spawn_worker;

/// Preconditions: `stream.fmt_valid()`. Called from `hw_params` when the
/// hook is already started, and from `start` for every pending stream with
/// a valid format.
pub(crate) fn stream_init(hook: &AudioHook, stream: &Arc<Stream>) -> Result<()> {
    debug_assert!(stream.fmt_valid());

    if stream.audio_id().0 == 0 {
        let issued = hook.state_registry.issue();
        stream.set_audio_id(issued.audio_id);
        stream.set_state_token(issued.state_token);
    }

    let format = stream.format().as_ref().copied().ok_or(HookError::Invalid)?;

    let transport = hook.transport.get().cloned().ok_or(HookError::NotReady)?;

    if stream.initialized() {
        // Bound to the old worker generation; replaced below.
        *stream.packet() = PacketContext::default();
    }

    {
        let mut guard = transport.lock().unwrap();
        guard
            .write_format(&AudioFormatMessage {
                audio: stream.audio_id().0,
                flags: format.flags,
                rate: format.rate,
                channels: format.channels,
            })
            .map_err(|e| HookError::HostError(e.to_string()))?;
    }
    stream.packet().format_sent = true;

    if stream.capture_running() {
        stream.set_capture_running(false);
        stream.handoff.full.post();
        stream.handoff.finished.wait();
        if let Some(handle) = stream.worker().take() {
            let _ = handle.join();
        }
    }

    let handle = spawn_worker(Arc::clone(stream), transport);
    *stream.worker() = Some(handle);
    stream.set_initialized(true);

    log::info!("stream {}: initialized ({} Hz, {} ch)", stream.audio_id().0, format.rate, format.channels);
    Ok(())
}
