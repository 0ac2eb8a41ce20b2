//! Sample format mapping and audio format flags.
//!
//! [`HostFormat`] and [`HostAccess`] stand in for the host audio library's
//! own format/access enums (`snd_pcm_format_t` / `snd_pcm_access_t` in the
//! ALSA case) — the hook installation layer that talks to the real host
//! library is out of scope for this crate, so callers translate their
//! host's values into these before calling into `audiotap_hook`.

use bitflags::bitflags;

/// Host-reported sample format, as observed from `hw_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFormat {
    S16LE,
    S24LE,
    S32LE,
    /// Any format this pipeline does not know how to frame.
    Other,
}

/// Host-reported access mode, as observed from `hw_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAccess {
    RwInterleaved,
    RwNonInterleaved,
    MmapInterleaved,
    MmapNonInterleaved,
    MmapComplex,
}

bitflags! {
    /// Flags describing the format of an emitted audio packet.
    ///
    /// Mirrors the `GLC_AUDIO_*` flag set this pipeline's wire protocol
    /// descends from: a sample-format bit plus an `INTERLEAVED` layout bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AudioFormat: u32 {
        const S16_LE = 0x01;
        const S24_LE = 0x02;
        const S32_LE = 0x04;
        const INTERLEAVED = 0x08;
    }
}

/// Maps a host sample format to the flag this pipeline emits downstream.
///
/// Table (§4.3): `S16LE -> S16_LE`, `S24LE -> S24_LE`, `S32LE -> S32_LE`,
/// anything else -> `None` (caller should fail the `hw_params` call with
/// `NotSupported`).
pub fn map_format(host: HostFormat) -> Option<AudioFormat> {
    match host {
        HostFormat::S16LE => Some(AudioFormat::S16_LE),
        HostFormat::S24LE => Some(AudioFormat::S24_LE),
        HostFormat::S32LE => Some(AudioFormat::S32_LE),
        HostFormat::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_formats() {
        assert_eq!(map_format(HostFormat::S16LE), Some(AudioFormat::S16_LE));
        assert_eq!(map_format(HostFormat::S24LE), Some(AudioFormat::S24_LE));
        assert_eq!(map_format(HostFormat::S32LE), Some(AudioFormat::S32_LE));
    }

    #[test]
    fn unknown_format_maps_to_none() {
        assert_eq!(map_format(HostFormat::Other), None);
    }

    #[test]
    fn format_flags_are_independent_bits() {
        let combo = AudioFormat::S16_LE | AudioFormat::INTERLEAVED;
        assert!(combo.contains(AudioFormat::S16_LE));
        assert!(combo.contains(AudioFormat::INTERLEAVED));
        assert!(!combo.contains(AudioFormat::S24_LE));
    }
}
