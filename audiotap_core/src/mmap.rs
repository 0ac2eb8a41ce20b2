//! MMap channel addressing and complex-to-interleaved conversion (§4.7-4.8).

use std::ptr;

use crate::error::{HookError, Result};

/// Descriptor for one channel's samples within a memory-mapped region.
///
/// `addr` is kept as a `usize` rather than a raw pointer so the value stays
/// `Send`/`Sync`/`Copy` when parked on a [`Stream`](crate) between
/// `mmap_begin` and `mmap_commit`; it is only ever reinterpreted as a
/// pointer at the point of the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelArea {
    pub addr: usize,
    /// Offset to the first sample, in bits.
    pub first_bits: usize,
    /// Distance between consecutive samples, in bits.
    pub step_bits: usize,
}

impl ChannelArea {
    pub fn new(addr: usize, first_bits: usize, step_bits: usize) -> Self {
        Self {
            addr,
            first_bits,
            step_bits,
        }
    }

    /// `area_addr(area, offset) = area.addr + first/8 + offset * (step/8)`.
    ///
    /// Sub-byte `first`/`step` are unsupported (§9 Open Question #3): rather
    /// than produce undefined output this fails with [`HookError::NotSupported`].
    pub fn sample_addr(&self, offset: usize) -> Result<usize> {
        if self.first_bits % 8 != 0 || self.step_bits % 8 != 0 {
            return Err(HookError::NotSupported);
        }
        Ok(self.addr + self.first_bits / 8 + offset * (self.step_bits / 8))
    }
}

/// Copies `len` bytes starting at `area.sample_addr(offset)` into `out`.
///
/// # Safety
/// `area.addr` must point at readable memory of at least
/// `first/8 + offset*(step/8) + len` bytes. The caller (a producer entry
/// point under its stream's write lock) is responsible for this; it holds
/// for the duration of one `mmap_begin`/`mmap_commit` window.
pub unsafe fn copy_from_area(area: &ChannelArea, offset: usize, len: usize, out: &mut [u8]) -> Result<()> {
    let src = area.sample_addr(offset)? as *const u8;
    debug_assert!(out.len() >= len);
    unsafe {
        ptr::copy_nonoverlapping(src, out.as_mut_ptr(), len);
    }
    Ok(())
}

/// Converts complex (per-channel base+stride) MMap access into a tightly
/// packed interleaved payload (§4.8).
///
/// `out` must be exactly `channels * frames * sample_bytes` bytes long.
///
/// # Safety
/// Each `areas[c]` must describe `frames` readable samples of
/// `sample_bytes` bytes starting at `offset`.
pub unsafe fn deinterleave_complex(
    areas: &[ChannelArea],
    offset: usize,
    frames: usize,
    sample_bytes: usize,
    out: &mut [u8],
) -> Result<()> {
    let channels = areas.len();
    let frame_bytes = sample_bytes * channels;
    debug_assert_eq!(out.len(), frame_bytes * frames);

    for (c, area) in areas.iter().enumerate() {
        for s in 0..frames {
            let dst_off = s * frame_bytes + c * sample_bytes;
            unsafe {
                copy_from_area(area, offset + s, sample_bytes, &mut out[dst_off..dst_off + sample_bytes])?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_addr_applies_offset_and_step() {
        let base = vec![0u8; 64];
        let area = ChannelArea::new(base.as_ptr() as usize, 0, 32);
        assert_eq!(area.sample_addr(0).unwrap(), base.as_ptr() as usize);
        assert_eq!(area.sample_addr(2).unwrap(), base.as_ptr() as usize + 8);
    }

    #[test]
    fn sub_byte_first_is_not_supported() {
        let area = ChannelArea::new(0x1000, 4, 16);
        assert_eq!(area.sample_addr(0), Err(HookError::NotSupported));
    }

    #[test]
    fn sub_byte_step_is_not_supported() {
        let area = ChannelArea::new(0x1000, 0, 12);
        assert_eq!(area.sample_addr(1), Err(HookError::NotSupported));
    }

    #[test]
    fn complex_conversion_interleaves_two_channels() {
        // Two channels, 4 frames, 2-byte samples, each channel a contiguous
        // buffer (step = sample_bytes*8 = stride of one sample).
        let left: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7]; // L0 L1 L2 L3 (2B each)
        let right: [u8; 8] = [10, 11, 12, 13, 14, 15, 16, 17]; // R0 R1 R2 R3

        let areas = [
            ChannelArea::new(left.as_ptr() as usize, 0, 16),
            ChannelArea::new(right.as_ptr() as usize, 0, 16),
        ];

        let mut out = vec![0u8; 2 * 4 * 2];
        unsafe {
            deinterleave_complex(&areas, 0, 4, 2, &mut out).unwrap();
        }

        assert_eq!(
            out,
            vec![0, 1, 10, 11, 2, 3, 12, 13, 4, 5, 14, 15, 6, 7, 16, 17]
        );
    }

    #[test]
    fn complex_conversion_honors_offset() {
        let left: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
        let areas = [ChannelArea::new(left.as_ptr() as usize, 0, 16)];

        let mut out = vec![0u8; 2 * 2];
        unsafe {
            deinterleave_complex(&areas, 1, 2, 2, &mut out).unwrap();
        }
        assert_eq!(out, vec![2, 3, 4, 5]);
    }
}
