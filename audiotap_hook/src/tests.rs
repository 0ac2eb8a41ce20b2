//! End-to-end tests against the in-memory reference transport (§8).

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use audiotap_core::{AudioFormat, ChannelArea, Clock, FixedClock, HostAccess, HostFormat};
use audiotap_transport::{
    ring_transport, AudioFormatMessage, AudioHeader, MessageHeader, MessageType, PacketTransport, RingTransportConsumer,
    TransportResult, AUDIO_HEADER_SIZE, MESSAGE_HEADER_SIZE,
};

use crate::{AtomicStateRegistry, AudioHook, HookError, HwParams, PcmId, StreamMode};

fn setup(capacity: usize) -> (AudioHook, Arc<FixedClock>, RingTransportConsumer) {
    let (tx, rx) = ring_transport(capacity);
    let clock = Arc::new(FixedClock::new(0));
    let hook = AudioHook::new(Arc::clone(&clock) as Arc<dyn Clock>, Arc::new(AtomicStateRegistry::new()));
    hook.set_buffer(Box::new(tx)).unwrap();
    (hook, clock, rx)
}

/// The capture worker writes its packet on a background thread; poll
/// briefly rather than assume it has already landed.
fn recv_packet_wait(rx: &mut RingTransportConsumer) -> Vec<u8> {
    for _ in 0..2000 {
        if let Some(packet) = rx.recv_packet() {
            return packet;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("timed out waiting for a packet");
}

fn s16_interleaved_params(rate: u32, channels: u32) -> HwParams {
    HwParams {
        format: HostFormat::S16LE,
        access: HostAccess::RwInterleaved,
        rate,
        channels,
        sample_bytes: 2,
    }
}

// --- Scenario 1: blocking interleaved writei ---

#[test]
fn blocking_interleaved_writei_emits_format_then_audio() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();

    let pcm = PcmId(1);
    hook.open(pcm, "test", StreamMode::empty()).unwrap();
    hook.hw_params(pcm, s16_interleaved_params(44_100, 2)).unwrap();

    let format_packet = recv_packet_wait(&mut rx);
    let format_header = MessageHeader::decode(&format_packet).unwrap();
    assert_eq!(format_header.message_type, MessageType::AudioFormat);
    let format_msg = AudioFormatMessage::decode(&format_packet[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(format_msg.audio, 1);
    assert_eq!(format_msg.flags, AudioFormat::S16_LE | AudioFormat::INTERLEAVED);
    assert_eq!(format_msg.rate, 44_100);
    assert_eq!(format_msg.channels, 2);

    let payload: Vec<u8> = (1..=16).collect();
    hook.writei(pcm, &payload, 4).unwrap();

    let audio_packet = recv_packet_wait(&mut rx);
    let audio_msg_header = MessageHeader::decode(&audio_packet).unwrap();
    assert_eq!(audio_msg_header.message_type, MessageType::Audio);
    let audio_header = AudioHeader::decode(&audio_packet[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(audio_header.audio, 1);
    assert_eq!(audio_header.size, 16);
    assert_eq!(&audio_packet[MESSAGE_HEADER_SIZE + AUDIO_HEADER_SIZE..], &payload[..]);

    assert!(rx.recv_packet().is_none());
}

// --- Scenario 2: writen rejected on an interleaved stream ---

#[test]
fn writen_on_interleaved_stream_is_rejected_and_emits_nothing() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(pcm, s16_interleaved_params(44_100, 2)).unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    let left = [0u8; 8];
    let right = [0u8; 8];
    let bufs: [&[u8]; 2] = [&left, &right];
    let err = hook.writen(pcm, &bufs, 4).unwrap_err();
    assert_eq!(err, HookError::Invalid);
    assert!(rx.recv_packet().is_none());
}

// --- Scenario 3: complex MMap produces an interleaved payload ---

#[test]
fn complex_mmap_produces_interleaved_payload() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(
        pcm,
        HwParams {
            format: HostFormat::S16LE,
            access: HostAccess::MmapComplex,
            rate: 48_000,
            channels: 2,
            sample_bytes: 2,
        },
    )
    .unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    let left: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
    let right: [u8; 8] = [10, 11, 12, 13, 14, 15, 16, 17];
    let areas = vec![
        ChannelArea::new(left.as_ptr() as usize, 0, 16),
        ChannelArea::new(right.as_ptr() as usize, 0, 16),
    ];

    hook.mmap_begin(pcm, areas, 0, 4).unwrap();
    let committed = hook.mmap_commit(pcm, 0, 4).unwrap();
    assert_eq!(committed, 4);

    let packet = recv_packet_wait(&mut rx);
    let header = MessageHeader::decode(&packet).unwrap();
    assert_eq!(header.message_type, MessageType::Audio);
    let audio_header = AudioHeader::decode(&packet[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(audio_header.size, 16);
    let payload = &packet[MESSAGE_HEADER_SIZE + AUDIO_HEADER_SIZE..];
    assert_eq!(payload, &[0, 1, 10, 11, 2, 3, 12, 13, 4, 5, 14, 15, 6, 7, 16, 17]);
}

// --- Scenario 4: async drop under allow-skip ---

struct GatedTransport {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl PacketTransport for GatedTransport {
    fn write_format(&mut self, _msg: &AudioFormatMessage) -> TransportResult<()> {
        Ok(())
    }

    fn write_audio(&mut self, _header: &AudioHeader, _payload: &[u8]) -> TransportResult<()> {
        let (lock, cvar) = &*self.gate;
        let mut released = lock.lock().unwrap();
        while !*released {
            released = cvar.wait(released).unwrap();
        }
        Ok(())
    }
}

#[test]
fn async_mode_drops_frame_when_worker_busy_and_allow_skip_set() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let transport = GatedTransport { gate: Arc::clone(&gate) };

    let hook = AudioHook::new(Arc::new(FixedClock::new(0)), Arc::new(AtomicStateRegistry::new()));
    hook.set_buffer(Box::new(transport)).unwrap();
    hook.start().unwrap();

    let pcm = PcmId(1);
    hook.open(pcm, "test", StreamMode::ASYNC).unwrap();
    hook.hw_params(
        pcm,
        HwParams {
            format: HostFormat::S16LE,
            access: HostAccess::RwInterleaved,
            rate: 44_100,
            channels: 1,
            sample_bytes: 2,
        },
    )
    .unwrap();

    // First frame: allow-skip is still off, so this spins past the worker's
    // startup window rather than racing it, then hands the buffer off — the
    // worker picks it up and blocks inside write_audio on `gate`.
    hook.writei(pcm, &[0, 0], 1).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    // Now the worker is provably still draining the first frame. Enabling
    // allow-skip and submitting a second frame must drop it.
    hook.allow_skip(true);
    let err = hook.writei(pcm, &[0, 0], 1).unwrap_err();
    assert_eq!(err, HookError::Busy);

    {
        let (lock, cvar) = &*gate;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
    hook.destroy();
}

// --- Scenario 5: format change re-initializes the worker ---

#[test]
fn format_change_reinitializes_worker_and_emits_new_format() {
    let (hook, _clock, mut rx) = setup(8);
    hook.start().unwrap();
    let pcm = PcmId(1);

    hook.hw_params(pcm, s16_interleaved_params(44_100, 2)).unwrap();
    let _format1 = recv_packet_wait(&mut rx);

    hook.writei(pcm, &[1u8; 16], 4).unwrap();
    let _audio1 = recv_packet_wait(&mut rx);

    hook.hw_params(
        pcm,
        HwParams {
            format: HostFormat::S32LE,
            access: HostAccess::RwInterleaved,
            rate: 48_000,
            channels: 2,
            sample_bytes: 4,
        },
    )
    .unwrap();

    let format2 = recv_packet_wait(&mut rx);
    let format2_msg = AudioFormatMessage::decode(&format2[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(format2_msg.audio, 1, "audio_id is stable across a format change");
    assert_eq!(format2_msg.flags, AudioFormat::S32_LE | AudioFormat::INTERLEAVED);
    assert_eq!(format2_msg.rate, 48_000);

    hook.writei(pcm, &[2u8; 32], 4).unwrap();
    let audio2 = recv_packet_wait(&mut rx);
    let audio2_header = AudioHeader::decode(&audio2[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(audio2_header.size, 32);
}

// --- Scenario 6: destroy mid-stream ---

#[test]
fn destroy_terminates_an_idle_worker_cleanly() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(pcm, s16_interleaved_params(44_100, 1)).unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    // The worker is idle on `full.wait()` at this point.
    hook.destroy();
    assert!(rx.recv_packet().is_none());
}

// --- Boundary behaviors ---

#[test]
fn mmap_commit_with_zero_channels_is_a_successful_no_op() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(
        pcm,
        HwParams {
            format: HostFormat::S16LE,
            access: HostAccess::MmapComplex,
            rate: 44_100,
            channels: 0,
            sample_bytes: 2,
        },
    )
    .unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    let committed = hook.mmap_commit(pcm, 0, 4).unwrap();
    assert_eq!(committed, 0);
    assert!(rx.recv_packet().is_none());
}

#[test]
fn zero_frame_writei_still_emits_an_empty_audio_packet() {
    let (hook, _clock, mut rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(pcm, s16_interleaved_params(44_100, 2)).unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    hook.writei(pcm, &[], 0).unwrap();
    let packet = recv_packet_wait(&mut rx);
    let header = AudioHeader::decode(&packet[MESSAGE_HEADER_SIZE..]).unwrap();
    assert_eq!(header.size, 0);
}

// --- Quantified invariants not already covered by a named scenario ---

#[test]
fn audio_packet_timestamps_are_monotonically_non_decreasing() {
    let (hook, clock, mut rx) = setup(8);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.hw_params(pcm, s16_interleaved_params(44_100, 1)).unwrap();
    let _format_packet = recv_packet_wait(&mut rx);

    clock.advance(100);
    hook.writei(pcm, &[0, 0], 1).unwrap();
    let first = AudioHeader::decode(&recv_packet_wait(&mut rx)[MESSAGE_HEADER_SIZE..]).unwrap();

    clock.advance(50);
    hook.writei(pcm, &[0, 0], 1).unwrap();
    let second = AudioHeader::decode(&recv_packet_wait(&mut rx)[MESSAGE_HEADER_SIZE..]).unwrap();

    assert!(second.timestamp >= first.timestamp);
}

#[test]
fn calling_start_twice_while_capturing_is_idempotent() {
    let (hook, _clock, _rx) = setup(4);
    hook.start().unwrap();
    hook.start().unwrap();
    assert!(hook.is_capturing());
}

#[test]
fn set_buffer_twice_fails_already_set() {
    let (hook, _clock, _rx) = setup(4);
    let (second_tx, _second_rx) = ring_transport(4);
    assert_eq!(hook.set_buffer(Box::new(second_tx)), Err(HookError::AlreadySet));
}

#[test]
fn start_without_a_transport_fails_not_ready() {
    let hook = AudioHook::new(Arc::new(FixedClock::new(0)), Arc::new(AtomicStateRegistry::new()));
    assert_eq!(hook.start(), Err(HookError::NotReady));
}

#[test]
fn unknown_sample_format_fails_not_supported() {
    let (hook, _clock, _rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    let err = hook
        .hw_params(
            pcm,
            HwParams {
                format: HostFormat::Other,
                access: HostAccess::RwInterleaved,
                rate: 44_100,
                channels: 2,
                sample_bytes: 2,
            },
        )
        .unwrap_err();
    assert_eq!(err, HookError::NotSupported);
}

#[test]
fn non_interleaved_access_mode_fails_not_supported() {
    let (hook, _clock, _rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    let err = hook
        .hw_params(
            pcm,
            HwParams {
                format: HostFormat::S16LE,
                access: HostAccess::RwNonInterleaved,
                rate: 44_100,
                channels: 2,
                sample_bytes: 2,
            },
        )
        .unwrap_err();
    assert_eq!(err, HookError::NotSupported);
}

#[test]
fn producer_calls_before_hw_params_are_invalid() {
    let (hook, _clock, _rx) = setup(4);
    hook.start().unwrap();
    let pcm = PcmId(1);
    hook.open(pcm, "test", StreamMode::empty()).unwrap();
    assert_eq!(hook.writei(pcm, &[0, 0], 1).unwrap_err(), HookError::Invalid);
}
