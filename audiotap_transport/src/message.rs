//! Wire format for the downstream packet protocol (§6).
//!
//! Every frame is little-endian and packed: a [`MessageHeader`] naming the
//! payload's type and byte length, followed by either an
//! [`AudioFormatMessage`] (sent whenever a stream's format is established or
//! changes) or an [`AudioHeader`] plus the raw captured bytes (sent for every
//! captured buffer).

use audiotap_core::AudioFormat;

use crate::error::{TransportError, TransportResult};

pub const MESSAGE_HEADER_SIZE: usize = 8;
pub const AUDIO_FORMAT_MESSAGE_SIZE: usize = 16;
pub const AUDIO_HEADER_SIZE: usize = 20;

/// Concrete wire values for `message_header.message_type`.
///
/// The surrounding system that owns the rest of the packet stream assigns
/// these; audiotap only needs the two message kinds it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Audio = 0,
    AudioFormat = 1,
}

impl MessageType {
    fn from_u32(value: u32) -> TransportResult<Self> {
        match value {
            0 => Ok(MessageType::Audio),
            1 => Ok(MessageType::AudioFormat),
            other => Err(TransportError::UnknownMessageType(other)),
        }
    }
}

/// `message_header`: a type tag plus the byte length of the payload that
/// immediately follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub size: u32,
}

impl MessageHeader {
    pub fn encode(&self) -> [u8; MESSAGE_HEADER_SIZE] {
        let mut buf = [0u8; MESSAGE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&(self.message_type as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> TransportResult<Self> {
        if bytes.len() < MESSAGE_HEADER_SIZE {
            return Err(TransportError::Truncated);
        }
        let message_type = MessageType::from_u32(u32::from_le_bytes(bytes[0..4].try_into().unwrap()))?;
        let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        Ok(Self { message_type, size })
    }
}

/// `audio_format_message`: announces (or re-announces, on format change) the
/// format of the stream identified by `audio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatMessage {
    /// Identifies which stream this format applies to.
    pub audio: u32,
    pub flags: AudioFormat,
    pub rate: u32,
    pub channels: u32,
}

impl AudioFormatMessage {
    pub fn encode(&self) -> [u8; AUDIO_FORMAT_MESSAGE_SIZE] {
        let mut buf = [0u8; AUDIO_FORMAT_MESSAGE_SIZE];
        buf[0..4].copy_from_slice(&self.audio.to_le_bytes());
        buf[4..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&self.rate.to_le_bytes());
        buf[12..16].copy_from_slice(&self.channels.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> TransportResult<Self> {
        if bytes.len() < AUDIO_FORMAT_MESSAGE_SIZE {
            return Err(TransportError::Truncated);
        }
        Ok(Self {
            audio: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            flags: AudioFormat::from_bits_truncate(u32::from_le_bytes(bytes[4..8].try_into().unwrap())),
            rate: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            channels: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        })
    }
}

/// `audio_header`: precedes the raw interleaved bytes of one captured buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioHeader {
    pub audio: u32,
    /// Monotonic capture timestamp, in microseconds (see `audiotap_core::clock`).
    pub timestamp: u64,
    /// Byte length of the payload that follows this header.
    pub size: u64,
}

impl AudioHeader {
    pub fn encode(&self) -> [u8; AUDIO_HEADER_SIZE] {
        let mut buf = [0u8; AUDIO_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.audio.to_le_bytes());
        buf[4..12].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[12..20].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> TransportResult<Self> {
        if bytes.len() < AUDIO_HEADER_SIZE {
            return Err(TransportError::Truncated);
        }
        Ok(Self {
            audio: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            timestamp: u64::from_le_bytes(bytes[4..12].try_into().unwrap()),
            size: u64::from_le_bytes(bytes[12..20].try_into().unwrap()),
        })
    }
}

/// Frames an `audio_format_message` behind its `message_header` into one
/// contiguous packet.
pub fn frame_format_message(msg: &AudioFormatMessage) -> Vec<u8> {
    let header = MessageHeader {
        message_type: MessageType::AudioFormat,
        size: AUDIO_FORMAT_MESSAGE_SIZE as u32,
    };
    let mut out = Vec::with_capacity(MESSAGE_HEADER_SIZE + AUDIO_FORMAT_MESSAGE_SIZE);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&msg.encode());
    out
}

/// Frames an `audio_header` plus its raw payload behind a `message_header`.
pub fn frame_audio(header: &AudioHeader, payload: &[u8]) -> Vec<u8> {
    let message_header = MessageHeader {
        message_type: MessageType::Audio,
        size: (AUDIO_HEADER_SIZE + payload.len()) as u32,
    };
    let mut out = Vec::with_capacity(MESSAGE_HEADER_SIZE + AUDIO_HEADER_SIZE + payload.len());
    out.extend_from_slice(&message_header.encode());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out
}
