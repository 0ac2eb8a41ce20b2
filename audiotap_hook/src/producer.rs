//! Producer entry points (§4.4): `open`, `close`, `hw_params`, `writei`,
//! `writen`, `mmap_begin`, `mmap_commit`.

use std::sync::atomic::Ordering;
use std::thread;

use audiotap_core::{copy_from_area, deinterleave_complex, map_format, AudioFormat, ChannelArea, HookError, HostAccess, HostFormat, Result};

use crate::init::stream_init;
use crate::registry::AudioHook;
use crate::stream::{Access, MmapWindow, NegotiatedFormat, PcmId, Stream, StreamMode};

/// Host-extracted `hw_params` fields (§4.3, §6). Extracting these from the
/// real host params object is a host-library contract out of scope here;
/// `sample_bytes` stands in for the host's own `frames_to_bytes`/
/// `samples_to_bytes` for one sample.
#[derive(Debug, Clone, Copy)]
pub struct HwParams {
    pub format: HostFormat,
    pub access: HostAccess,
    pub rate: u32,
    pub channels: u32,
    pub sample_bytes: u32,
}

impl AudioHook {
    /// `open(pcm, name, stream_kind, mode)` (§4.4): register the stream,
    /// record its mode.
    pub fn open(&self, pcm: PcmId, name: &str, mode: StreamMode) -> Result<()> {
        let stream = self.get_or_create_stream(pcm, mode);
        stream.set_mode(mode);
        log::info!("{name}: opened (mode={mode:?})");
        Ok(())
    }

    /// `close(pcm)` (§4.4): idempotent; clears `fmt_valid` so the next
    /// `start` skips this stream until it re-negotiates a format. The
    /// worker is intentionally left running — see DESIGN.md's note on the
    /// corresponding Open Question.
    pub fn close(&self, pcm: PcmId) -> Result<()> {
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        stream.set_fmt_valid(false);
        log::info!("stream {}: closed", stream.audio_id().0);
        Ok(())
    }

    /// `hw_params(pcm, params)` (§4.3, §4.4). Unlike the data-path entry
    /// points below, this one runs regardless of `capturing` — format
    /// negotiation must succeed even before capture starts.
    pub fn hw_params(&self, pcm: PcmId, params: HwParams) -> Result<()> {
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        let _guard = stream.handoff.write_lock.lock();

        let sample_flag = map_format(params.format).ok_or_else(|| {
            log::error!("pcm={:?}: unsupported audio format {:?}", pcm, params.format);
            HookError::NotSupported
        })?;

        let (access, mut flags) = match params.access {
            HostAccess::RwInterleaved | HostAccess::MmapInterleaved => (Access::Interleaved, AudioFormat::INTERLEAVED),
            HostAccess::MmapComplex => (Access::Complex, AudioFormat::INTERLEAVED),
            HostAccess::RwNonInterleaved | HostAccess::MmapNonInterleaved => {
                log::error!("pcm={:?}: unsupported access mode {:?}", pcm, params.access);
                return Err(HookError::NotSupported);
            }
        };
        flags |= sample_flag;

        log::debug!(
            "pcm={:?}: {} channels, rate {}, flags {:?}",
            pcm,
            params.channels,
            params.rate,
            flags
        );

        *stream.format() = Some(NegotiatedFormat {
            flags,
            rate: params.rate,
            channels: params.channels,
            sample_bytes: params.sample_bytes,
            access,
        });
        stream.set_fmt_valid(true);

        if self.started.load(Ordering::Acquire) {
            stream_init(self, &stream)?;
        }
        Ok(())
    }

    /// `writei(pcm, buf, frames)` (§4.4).
    pub fn writei(&self, pcm: PcmId, buf: &[u8], frames: u32) -> Result<()> {
        if !self.is_capturing() {
            return Ok(());
        }
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        if !stream.initialized() {
            return Err(HookError::Invalid);
        }

        let _guard = stream.handoff.write_lock.lock();
        self.wait_for_worker_ready(&stream)?;

        let format = stream.format().as_ref().copied().ok_or(HookError::Invalid)?;
        let size = format.frames_to_bytes(frames) as usize;
        {
            let mut scratch = stream.scratch();
            scratch.set_size(size);
            scratch.payload_mut().copy_from_slice(&buf[..size]);
            scratch.set_time(self.clock.now_micros());
        }
        stream.handoff.full.post();
        Ok(())
    }

    /// `writen(pcm, bufs, frames)` (§4.4): refuses non-interleaved writes
    /// against a stream negotiated as interleaved, rather than guess.
    pub fn writen(&self, pcm: PcmId, bufs: &[&[u8]], frames: u32) -> Result<()> {
        if !self.is_capturing() {
            return Ok(());
        }
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        if !stream.initialized() {
            return Err(HookError::Invalid);
        }

        let _guard = stream.handoff.write_lock.lock();

        let format = stream.format().as_ref().copied().ok_or(HookError::Invalid)?;
        if format.flags.contains(AudioFormat::INTERLEAVED) {
            log::error!("stream {}: format (interleaved) incompatible with writen", stream.audio_id().0);
            return Err(HookError::Invalid);
        }

        self.wait_for_worker_ready(&stream)?;

        let channel_bytes = format.samples_to_bytes(frames) as usize;
        {
            let mut scratch = stream.scratch();
            scratch.set_size(channel_bytes * format.channels as usize);
            for (c, buf) in bufs.iter().enumerate().take(format.channels as usize) {
                let dst_off = c * channel_bytes;
                scratch.payload_mut()[dst_off..dst_off + channel_bytes].copy_from_slice(&buf[..channel_bytes]);
            }
            scratch.set_time(self.clock.now_micros());
        }
        stream.handoff.full.post();
        Ok(())
    }

    /// `mmap_begin(pcm, areas, offset, frames)` (§4.4): records the window,
    /// copies nothing yet.
    pub fn mmap_begin(&self, pcm: PcmId, areas: Vec<ChannelArea>, offset: u64, frames: u32) -> Result<()> {
        if !self.is_capturing() {
            return Ok(());
        }
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        if !stream.initialized() {
            return Err(HookError::Invalid);
        }

        let _guard = stream.handoff.write_lock.lock();
        *stream.mmap() = Some(MmapWindow { areas, offset, frames });
        Ok(())
    }

    /// `mmap_commit(pcm, offset, frames)` (§4.4): performs the deferred
    /// copy, choosing the interleaved/complex/planar path by the stream's
    /// negotiated access mode. Returns the number of frames committed.
    pub fn mmap_commit(&self, pcm: PcmId, offset: u64, frames: u32) -> Result<u32> {
        if !self.is_capturing() {
            return Ok(frames);
        }
        let stream = self.get_or_create_stream(pcm, StreamMode::empty());
        if !stream.initialized() {
            return Err(HookError::Invalid);
        }

        let _guard = stream.handoff.write_lock.lock();

        let format = stream.format().as_ref().copied().ok_or(HookError::Invalid)?;
        if format.channels == 0 {
            return Ok(0);
        }

        let window = stream.mmap().take().ok_or(HookError::Invalid)?;
        if window.offset != offset {
            log::warn!(
                "pcm={:?}: mmap_commit offset {} differs from mmap_begin offset {}, proceeding",
                pcm,
                offset,
                window.offset
            );
        }

        self.wait_for_worker_ready(&stream)?;

        let size = format.frames_to_bytes(frames) as usize;
        {
            let mut scratch = stream.scratch();
            scratch.set_size(size);
            match format.access {
                Access::Interleaved => unsafe {
                    copy_from_area(&window.areas[0], offset as usize, size, scratch.payload_mut())
                        .map_err(|_| HookError::NotSupported)?;
                },
                Access::Complex => unsafe {
                    deinterleave_complex(
                        &window.areas,
                        offset as usize,
                        frames as usize,
                        format.sample_bytes as usize,
                        scratch.payload_mut(),
                    )
                    .map_err(|_| HookError::NotSupported)?;
                },
                Access::NonInterleaved => {
                    let channel_bytes = format.samples_to_bytes(frames) as usize;
                    for (c, area) in window.areas.iter().enumerate() {
                        let dst_off = c * channel_bytes;
                        unsafe {
                            copy_from_area(area, offset as usize, channel_bytes, &mut scratch.payload_mut()[dst_off..dst_off + channel_bytes])
                                .map_err(|_| HookError::NotSupported)?;
                        }
                    }
                }
            }
            scratch.set_time(self.clock.now_micros());
        }
        stream.handoff.full.post();
        Ok(frames)
    }

    /// Locking discipline + wait-for-worker-ready (§4.4), shared by every
    /// data-path entry point.
    fn wait_for_worker_ready(&self, stream: &Stream) -> Result<()> {
        if stream.is_async() {
            loop {
                if stream.handoff.capture_ready.load(Ordering::Acquire) {
                    return Ok(());
                }
                if self.is_allow_skip() {
                    log::warn!("stream {}: dropped audio data", stream.audio_id().0);
                    return Err(HookError::Busy);
                }
                thread::yield_now();
            }
        } else {
            stream.handoff.empty.wait();
            Ok(())
        }
    }
}
