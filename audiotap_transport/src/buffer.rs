//! A packet transport and a lock-free in-memory reference implementation.
//!
//! The capture worker thread (`audiotap_hook`) is the transport's sole
//! writer; whatever drains packets downstream is the sole reader. That
//! shape is exactly what the workspace's SPSC ring buffer models, so
//! [`RingTransport`] is a thin framing layer on top of it.

use audiotap_core::spsc::{Consumer, Producer, SpscRingBuffer};

use crate::error::{TransportError, TransportResult};
use crate::message::{frame_audio, frame_format_message, AudioFormatMessage, AudioHeader};

/// A destination for framed packets emitted by the capture worker.
///
/// One `write_format` call precedes the first `write_audio` call for a
/// stream, and again whenever that stream's format changes; every captured
/// buffer produces exactly one `write_audio` call.
pub trait PacketTransport: Send {
    fn write_format(&mut self, msg: &AudioFormatMessage) -> TransportResult<()>;
    fn write_audio(&mut self, header: &AudioHeader, payload: &[u8]) -> TransportResult<()>;
}

/// Producer half of an in-memory, lock-free packet transport.
pub struct RingTransportProducer {
    producer: Producer<Vec<u8>>,
}

impl PacketTransport for RingTransportProducer {
    fn write_format(&mut self, msg: &AudioFormatMessage) -> TransportResult<()> {
        self.producer
            .try_push(frame_format_message(msg))
            .map_err(|_| TransportError::Full)
    }

    fn write_audio(&mut self, header: &AudioHeader, payload: &[u8]) -> TransportResult<()> {
        self.producer
            .try_push(frame_audio(header, payload))
            .map_err(|_| TransportError::Full)
    }
}

impl RingTransportProducer {
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    pub fn len(&self) -> usize {
        self.producer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producer.is_empty()
    }
}

/// Consumer half of an in-memory, lock-free packet transport.
///
/// Each `recv_packet` call returns one complete, already-framed packet:
/// a `message_header` followed by its payload.
pub struct RingTransportConsumer {
    consumer: Consumer<Vec<u8>>,
}

impl RingTransportConsumer {
    pub fn recv_packet(&mut self) -> Option<Vec<u8>> {
        self.consumer.try_pop()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.consumer.len()
    }
}

/// Creates an in-memory packet transport pair with room for `capacity`
/// in-flight packets.
pub fn ring_transport(capacity: usize) -> (RingTransportProducer, RingTransportConsumer) {
    let (producer, consumer) = SpscRingBuffer::new(capacity);
    (RingTransportProducer { producer }, RingTransportConsumer { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiotap_core::AudioFormat;

    #[test]
    fn format_then_audio_packet_are_received_in_order() {
        let (mut tx, mut rx) = ring_transport(4);

        tx.write_format(&AudioFormatMessage {
            audio: 1,
            flags: AudioFormat::S16_LE | AudioFormat::INTERLEAVED,
            rate: 48_000,
            channels: 2,
        })
        .unwrap();
        tx.write_audio(
            &AudioHeader {
                audio: 1,
                timestamp: 5,
                size: 4,
            },
            &[1, 2, 3, 4],
        )
        .unwrap();

        assert_eq!(rx.len(), 2);
        let first = rx.recv_packet().unwrap();
        let second = rx.recv_packet().unwrap();
        assert!(rx.recv_packet().is_none());

        use crate::message::{MessageHeader, MessageType, MESSAGE_HEADER_SIZE};
        assert_eq!(MessageHeader::decode(&first).unwrap().message_type, MessageType::AudioFormat);
        assert_eq!(MessageHeader::decode(&second).unwrap().message_type, MessageType::Audio);
        assert_eq!(&second[MESSAGE_HEADER_SIZE + 20..], &[1, 2, 3, 4]);
    }

    #[test]
    fn full_transport_reports_full_instead_of_blocking() {
        let (mut tx, _rx) = ring_transport(1);
        let header = AudioHeader {
            audio: 1,
            timestamp: 0,
            size: 0,
        };
        tx.write_audio(&header, &[]).unwrap();
        assert_eq!(tx.write_audio(&header, &[]), Err(TransportError::Full));
    }
}
