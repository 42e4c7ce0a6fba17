//! ProTracker-family `.mod` decoder: 31-sample format with a 4-byte
//! channel-count tag at offset 1080.

use crate::bytereader::{ByteReader, Encoding};
use crate::error::EngineError;
use crate::fixed::C2Rate;
use crate::instrument::Instrument;
use crate::module::Module;
use crate::pattern::{Note, Pattern};
use crate::sample::Sample;

const NUM_SAMPLES: usize = 31;
const ORDER_TABLE_LEN: usize = 128;
const SAMPLE_HEADER_OFFSET: usize = 20;
const SAMPLE_HEADER_LEN: usize = 30;
const TAG_OFFSET: usize = SAMPLE_HEADER_OFFSET + NUM_SAMPLES * SAMPLE_HEADER_LEN + 1 + ORDER_TABLE_LEN;

pub struct ModDecoder;

impl super::FormatDecoder for ModDecoder {
    fn name(&self) -> &'static str {
        "ProTracker MOD"
    }

    fn recognises(&self, data: &[u8]) -> bool {
        data.len() > TAG_OFFSET + 4 && channels_for_tag(&tag_str(data)).is_some()
    }

    fn decode(&self, data: &[u8]) -> Result<Module, EngineError> {
        if data.len() <= TAG_OFFSET + 4 {
            return Err(EngineError::MalformedFormat { reason: "file too short for a MOD header".into() });
        }
        let tag = tag_str(data);
        let num_channels = channels_for_tag(&tag)
            .ok_or_else(|| EngineError::MalformedFormat { reason: format!("unrecognised MOD tag {tag:?}") })?;

        let mut r = ByteReader::new(data, Encoding::BigEndian);
        let song_name = r.read_str(20)?;

        let mut samples = Vec::with_capacity(NUM_SAMPLES + 1);
        samples.push(Sample::default());
        let mut raw_lengths = [0usize; NUM_SAMPLES];
        let mut finetunes = [0i32; NUM_SAMPLES];
        let mut volumes = [0i32; NUM_SAMPLES];
        let mut loop_starts = [0usize; NUM_SAMPLES];
        let mut loop_lengths = [0usize; NUM_SAMPLES];
        for i in 0..NUM_SAMPLES {
            let _name = r.read_str(22)?;
            let length_words = r.read_u16()? as usize;
            let finetune_nibble = (r.read_i8()? << 4) >> 4; // sign-extend low nibble
            let volume = r.read_u8()? as i32;
            let loop_start_words = r.read_u16()? as usize;
            let loop_len_words = r.read_u16()? as usize;
            raw_lengths[i] = length_words * 2;
            finetunes[i] = finetune_nibble as i32 * 2;
            volumes[i] = if volume > 64 { 64 } else { volume };
            loop_starts[i] = loop_start_words * 2;
            loop_lengths[i] = loop_len_words * 2;
        }

        let song_length = r.read_u8()? as usize;
        let restart_byte = r.read_u8()? as usize;
        let order_table = r.read_bytes(ORDER_TABLE_LEN)?.to_vec();
        let _tag = r.read_bytes(4)?;

        let song_length = song_length.min(ORDER_TABLE_LEN).max(1);
        let sequence: Vec<usize> = order_table[..song_length].iter().map(|&b| b as usize).collect();
        let num_patterns = sequence.iter().copied().max().map(|m| m + 1).unwrap_or(1);

        let mut patterns: Vec<Pattern> = (0..num_patterns).map(|_| Pattern::new(num_channels, 64)).collect();
        for pattern in patterns.iter_mut() {
            let mut note = Note::default();
            for row in 0..pattern.num_rows {
                for chan in 0..num_channels {
                    let b = r.read_bytes(4)?;
                    let period = (((b[0] & 0x0F) as u16) << 8) | b[1] as u16;
                    let sample_num = (b[0] & 0xF0) | (b[2] >> 4);
                    let effect = (b[2] & 0x0F) as i32;
                    let param = b[3] as i32;
                    note.key = period_to_key(period);
                    note.instrument = sample_num as i32;
                    note.volume = 0;
                    note.effect = effect;
                    note.param = param;
                    pattern.set_note(row * num_channels + chan, &note);
                }
            }
        }

        for i in 0..NUM_SAMPLES {
            let len = raw_lengths[i];
            let raw = r.read_bytes(len).unwrap_or(&[]);
            let pcm: Vec<i16> = raw.iter().map(|&b| (b as i8 as i16) << 8).collect();
            let mut sample = Sample {
                volume: volumes[i],
                panning: -1,
                rel_note: 0,
                fine_tune: finetunes[i],
                c2_rate: C2Rate::PAL,
                loop_start: 0,
                loop_length: 0,
                sample_data: Vec::new(),
                name: String::new(),
            };
            if loop_lengths[i] > 2 && loop_starts[i] + loop_lengths[i] <= pcm.len() {
                sample.set_sample_data(&pcm, loop_starts[i] as i32, loop_lengths[i] as i32, false);
            } else {
                sample.set_sample_data(&pcm, pcm.len() as i32, 0, false);
            }
            samples.push(sample);
        }

        // MOD has no separate instrument table: the note stream addresses a
        // sample slot directly. We model each of the 31 sample slots as its
        // own one-sample instrument, keyed 1:1 with `note.instrument`.
        let mut instruments = vec![Instrument::default_instrument()];
        for sam in samples.into_iter().skip(1) {
            instruments.push(Instrument {
                name: sam.name.clone(),
                vibrato_type: 0,
                vibrato_sweep: 0,
                vibrato_depth: 0,
                vibrato_rate: 0,
                volume_fade_out: 0,
                samples: vec![sam],
                key_to_sample: [0usize; 97],
                volume_envelope: crate::envelope::Envelope::default(),
                panning_envelope: crate::envelope::Envelope::default(),
            });
        }

        Ok(Module {
            song_name,
            num_channels,
            num_instruments: instruments.len() - 1,
            sequence_length: sequence.len(),
            restart_pos: if restart_byte < sequence.len() { restart_byte } else { 0 },
            sequence,
            patterns,
            instruments,
            default_panning: default_panning(num_channels),
            linear_periods: false,
            fast_vol_slides: false,
            c2_rate: C2Rate::PAL,
            gain: 64,
            default_gvol: 64,
            default_speed: 6,
            default_tempo: 125,
        })
    }
}

/// Classic Amiga hard-panned stereo split: channels alternate hard
/// left/right in pairs (LRRL repeating), the convention ProTracker's
/// 4-channel mixer hardwires in its output stage.
fn default_panning(num_channels: usize) -> Vec<i32> {
    (0..num_channels)
        .map(|c| if c % 4 == 0 || c % 4 == 3 { 0 } else { 255 })
        .collect()
}

fn tag_str(data: &[u8]) -> String {
    String::from_utf8_lossy(&data[TAG_OFFSET..TAG_OFFSET + 4]).to_string()
}

fn channels_for_tag(tag: &str) -> Option<usize> {
    match tag {
        "M.K." | "M!K!" | "FLT4" | "N.T." | "EXO4" | "LARD" | "PATT" => Some(4),
        "OCTA" | "CD81" | "FA08" => Some(8),
        _ => {
            if let Some(prefix) = tag.strip_suffix("CHN") {
                prefix.trim().parse::<usize>().ok()
            } else {
                tag.strip_suffix("CH").and_then(|prefix| prefix.trim().parse::<usize>().ok())
            }
        }
    }
}

/// Converts an Amiga hardware period to this engine's chromatic key
/// numbering, anchored at period 428 == key 49 (the standard `C-3`
/// reference pitch used across tracker engines for 8-bit PCM tuning).
fn period_to_key(period: u16) -> i32 {
    if period == 0 {
        return 0;
    }
    let semitones = 12.0 * (428.0_f64 / period as f64).log2();
    (49.0 + semitones).round().clamp(1.0, 120.0) as i32
}
