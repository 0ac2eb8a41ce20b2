//! The per-stream capture worker thread (§4.5).

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use audiotap_transport::{AudioHeader, PacketTransport};

use crate::stream::Stream;

/// Spawns the capture worker for `stream`, writing framed `AUDIO` packets
/// into `transport` as buffers arrive.
///
/// Marks the stream's `capture_running` flag before returning; the thread
/// itself raises `capture_ready` once it is looping.
pub fn spawn_worker(stream: Arc<Stream>, transport: Arc<Mutex<Box<dyn PacketTransport>>>) -> JoinHandle<()> {
    stream.set_capture_running(true);
    thread::spawn(move || worker_loop(stream, transport))
}

fn worker_loop(stream: Arc<Stream>, transport: Arc<Mutex<Box<dyn PacketTransport>>>) {
    stream.handoff.signal_capture_ready();

    loop {
        stream.handoff.full.wait();
        stream.handoff.capture_ready.store(false, Ordering::Release);

        if !stream.capture_running() {
            break;
        }

        let audio_id = stream.audio_id().0;
        let scratch = stream.scratch();
        let header = AudioHeader {
            audio: audio_id,
            timestamp: scratch.time(),
            size: scratch.payload().len() as u64,
        };

        {
            let mut guard = transport.lock().unwrap();
            if let Err(e) = guard.write_audio(&header, scratch.payload()) {
                log::error!("stream {audio_id}: failed to write audio packet: {e}");
            }
        }
        drop(scratch);

        if !stream.is_async() {
            stream.handoff.empty.post();
        }
        stream.handoff.signal_capture_ready();
    }

    stream.handoff.finished.post();
}
