//! Decoded module data: channel count, pattern sequence, instrument table,
//! and the format-derived pitch/mixing model flags.

use crate::fixed::C2Rate;
use crate::instrument::Instrument;
use crate::pattern::Pattern;

#[derive(Debug, Clone)]
pub struct Module {
    pub song_name: String,
    pub num_channels: usize,
    pub num_instruments: usize,
    pub sequence_length: usize,
    pub restart_pos: usize,
    /// Pattern index played at each position in the song order.
    pub sequence: Vec<usize>,
    pub patterns: Vec<Pattern>,
    /// Index 0 is the sentinel default instrument every `Channel` boots
    /// pointing at; real instruments occupy 1..=num_instruments.
    pub instruments: Vec<Instrument>,
    /// Initial left/right split per channel, 0 (full left) to 255 (full right).
    pub default_panning: Vec<i32>,
    /// XM-style linear period/frequency model vs. Amiga (MOD/S3M) period table.
    pub linear_periods: bool,
    /// S3M/XM "fast" volume-slide semantics: slide applies on tick 0 too.
    pub fast_vol_slides: bool,
    pub c2_rate: C2Rate,
    /// Global gain, applied as `gain/32` in `Channel::calculate_amplitude`.
    pub gain: i32,
    /// Initial global volume, speed, and tempo `Engine::set_sequence_pos`
    /// resets playback to.
    pub default_gvol: i32,
    pub default_speed: i32,
    pub default_tempo: i32,
}

impl Module {
    /// A minimal, silent module: one channel, one empty pattern, the
    /// sentinel instrument only. Used as an engine smoke-test fixture and
    /// as the fallback when a decoder otherwise has nothing to offer.
    pub fn blank() -> Self {
        Module {
            song_name: String::new(),
            num_channels: 1,
            num_instruments: 0,
            sequence_length: 1,
            // Past the end of the (one-entry) sequence, so the single
            // pattern plays once and the song ends rather than looping.
            restart_pos: 1,
            sequence: vec![0],
            patterns: vec![Pattern::new(1, 64)],
            instruments: vec![Instrument::default_instrument()],
            default_panning: vec![128],
            linear_periods: false,
            fast_vol_slides: false,
            c2_rate: C2Rate::PAL,
            gain: 64,
            default_gvol: 64,
            default_speed: 6,
            default_tempo: 125,
        }
    }

    pub fn pattern_for_sequence_pos(&self, pos: usize) -> &Pattern {
        let idx = self.sequence[pos % self.sequence_length];
        &self.patterns[idx]
    }
}
