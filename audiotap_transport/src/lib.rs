//! # audiotap_transport
//!
//! Wire framing for the packet stream a capture worker emits downstream,
//! plus [`RingTransport`](buffer::PacketTransport) — an in-memory, lock-free
//! reference transport built on `audiotap_core`'s SPSC ring buffer. Real
//! deployments plug in their own [`PacketTransport`](buffer::PacketTransport)
//! (a shared-memory segment, a socket, whatever the surrounding system
//! already uses); this crate only owns the byte layout and a working
//! implementation to test and demonstrate against.

pub mod buffer;
pub mod error;
pub mod message;

pub use buffer::{ring_transport, PacketTransport, RingTransportConsumer, RingTransportProducer};
pub use error::{TransportError, TransportResult};
pub use message::{
    frame_audio, frame_format_message, AudioFormatMessage, AudioHeader, MessageHeader, MessageType,
    AUDIO_FORMAT_MESSAGE_SIZE, AUDIO_HEADER_SIZE, MESSAGE_HEADER_SIZE,
};
