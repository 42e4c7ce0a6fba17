//! Fixed-point constants shared by the resampler and the channel engine.
//!
//! Mirrors the constant block at the top of the original `ibxmgo` module
//! package; values must match exactly for golden-master parity.

pub const FP_SHIFT: i32 = 15;
pub const FP_ONE: i32 = 1 << FP_SHIFT;
pub const FP_MASK: i32 = FP_ONE - 1;

pub const LOG2_FILTER_TAPS: i32 = 4;
pub const FILTER_TAPS: i32 = 1 << LOG2_FILTER_TAPS;
pub const DELAY: i32 = FILTER_TAPS / 2;

pub const LOG2_TABLE_ACCURACY: i32 = 4;
pub const TABLE_INTERP_SHIFT: i32 = FP_SHIFT - LOG2_TABLE_ACCURACY;
pub const TABLE_INTERP_ONE: i32 = 1 << TABLE_INTERP_SHIFT;
pub const TABLE_INTERP_MASK: i32 = TABLE_INTERP_ONE - 1;

/// Playback reference rate for middle C, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct C2Rate(pub i32);

impl C2Rate {
    pub const PAL: C2Rate = C2Rate(8287);
    pub const NTSC: C2Rate = C2Rate(8363);
}

impl Default for C2Rate {
    fn default() -> Self {
        C2Rate::PAL
    }
}
