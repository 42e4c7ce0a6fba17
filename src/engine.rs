//! Sequencer and mixer: owns the per-channel state machines, walks the
//! pattern sequence tick by tick, and renders interleaved stereo i16 audio.

use crate::channel::{Channel, Interpolation};
use crate::error::EngineError;
use crate::module::Module;
use crate::pattern::Note;

const MIN_SAMPLE_RATE: u32 = 8000;
const MAX_SAMPLE_RATE: u32 = 128_000;
const MIN_TEMPO: i32 = 32;
/// Read-ahead margin (in frames) carried past the end of a tick so the
/// 3-tap downsample filter and the next tick's ramp source both have the
/// lookahead they need.
const MIX_MARGIN: i32 = 65;

pub struct Engine<'m> {
    module: &'m Module,
    channels: Vec<Channel<'m>>,
    sample_rate: i32,
    interpolation: Interpolation,

    seq_pos: usize,
    row: i32,
    next_row: i32,
    tick: i32,
    speed: i32,
    tempo: i32,
    pattern_delay: i32,
    global_vol: i32,
    breakpoint: bool,
    song_ended: bool,

    pl_row: i32,
    pl_count: i32,
    pl_channel: i32,

    tick_offset: i32,
    /// 2x-oversampled stereo accumulation buffer, downsampled in place each
    /// tick; sized for the longest possible tick (tempo == `MIN_TEMPO`) at
    /// the current sample rate, plus downsample/ramp lookahead margin.
    mix_buf: Vec<i32>,
    /// Tail of the previous tick's downsampled render, cross-faded into the
    /// head of the next tick to mask the discontinuity at tick boundaries.
    ramp_buf: [i32; 128],
}

impl<'m> Engine<'m> {
    pub fn new(module: &'m Module, sample_rate: i32) -> Result<Self, EngineError> {
        if !(MIN_SAMPLE_RATE as i32..=MAX_SAMPLE_RATE as i32).contains(&sample_rate) {
            return Err(EngineError::UnsupportedSamplingRate { rate: sample_rate as u32 });
        }
        let channels = (0..module.num_channels)
            .map(|id| Channel::new(module, id))
            .collect();
        let buf_len = Self::mix_buffer_length(sample_rate) as usize;
        let mut engine = Engine {
            module,
            channels,
            sample_rate,
            interpolation: Interpolation::Linear,
            seq_pos: 0,
            row: 0,
            next_row: 0,
            tick: 0,
            speed: 6,
            tempo: 125,
            pattern_delay: 0,
            global_vol: module.default_gvol,
            breakpoint: false,
            song_ended: false,
            pl_row: 0,
            pl_count: -1,
            pl_channel: 0,
            tick_offset: 0,
            mix_buf: vec![0; buf_len],
            ramp_buf: [0; 128],
        };
        engine.set_sequence_pos(0);
        Ok(engine)
    }

    pub fn set_sample_rate(&mut self, sample_rate: i32) -> Result<(), EngineError> {
        if !(MIN_SAMPLE_RATE as i32..=MAX_SAMPLE_RATE as i32).contains(&sample_rate) {
            return Err(EngineError::UnsupportedSamplingRate { rate: sample_rate as u32 });
        }
        self.sample_rate = sample_rate;
        let buf_len = Self::mix_buffer_length(sample_rate) as usize;
        self.mix_buf = vec![0; buf_len];
        Ok(())
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Element count of the oversampled mix buffer at the slowest tempo the
    /// row format can express: `(tick_len + margin) * 4` (2 channels, 2x
    /// oversampling).
    pub fn mix_buffer_length(sample_rate: i32) -> i32 {
        (Self::calculate_tick_len(MIN_TEMPO, sample_rate) + MIX_MARGIN) * 4
    }

    fn calculate_tick_len(tempo: i32, sample_rate: i32) -> i32 {
        ((sample_rate as i64 * 5) / (tempo as i64 * 2)) as i32
    }

    /// Sets the pattern in the sequence to play. Tempo, speed, and global
    /// volume are reset to the module's defaults and row 0 is processed
    /// immediately, via the same tick-preset/decrement scheme `do_tick`
    /// uses on every subsequent call, so the very first `get_audio` call
    /// renders row 0 rather than `speed - 1` ticks of untriggered silence.
    pub fn set_sequence_pos(&mut self, pos: usize) {
        let pos = if self.module.sequence_length == 0 {
            0
        } else {
            pos % self.module.sequence_length
        };
        self.seq_pos = pos;
        self.row = 0;
        self.next_row = 0;
        self.tick = 1;
        self.tick_offset = 0;
        self.pattern_delay = 0;
        self.global_vol = self.module.default_gvol;
        self.speed = if self.module.default_speed > 0 { self.module.default_speed } else { 6 };
        self.tempo = if self.module.default_tempo > 0 { self.module.default_tempo } else { 125 };
        self.pl_count = -1;
        self.pl_row = 0;
        self.breakpoint = false;
        self.ramp_buf = [0; 128];
        self.song_ended = !self.do_tick();
    }

    pub fn sequence_pos(&self) -> usize {
        self.seq_pos
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    /// Samples rendered per tick at the current tempo and sample rate.
    pub fn tick_len(&self) -> i32 {
        Self::calculate_tick_len(self.tempo, self.sample_rate)
    }

    /// Renders up to `out.len() / 2` stereo frames, returns the number of
    /// frames actually written (0 once playback reaches the song's end).
    pub fn get_audio(&mut self, out: &mut [i16]) -> usize {
        let mut frames_written = 0;
        let want_frames = out.len() / 2;
        while frames_written < want_frames {
            if self.song_ended {
                break;
            }
            if self.tick_offset == 0 {
                self.render_tick();
            }
            let tick_len = self.tick_len();
            let remaining_in_tick = tick_len - self.tick_offset;
            let remaining_out = (want_frames - frames_written) as i32;
            let count = remaining_in_tick.min(remaining_out);
            for frame in 0..count as usize {
                let src = (self.tick_offset as usize + frame) * 2;
                let l = self.mix_buf[src].clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                let r = self.mix_buf[src + 1].clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                out[(frames_written + frame) * 2] = l;
                out[(frames_written + frame) * 2 + 1] = r;
            }
            frames_written += count as usize;
            self.tick_offset += count;
            if self.tick_offset >= tick_len {
                self.tick_offset = 0;
                if !self.do_tick() {
                    self.song_ended = true;
                }
            }
        }
        frames_written
    }

    /// Renders one tick of audio into `mix_buf`, using the channel state as
    /// it stands *before* this call (established by the previous `do_tick`,
    /// or the priming call in `set_sequence_pos`): resamples every channel
    /// at 2x the output rate, 2:1-downsamples the result with a 3-tap
    /// anti-aliasing filter, then cross-fades the tick boundary.
    fn render_tick(&mut self) {
        let tick_len = self.tick_len();
        let oversample_rate = self.sample_rate * 2;
        let oversampled_frames = tick_len + MIX_MARGIN;
        let clear_len = (oversampled_frames as usize * 4).min(self.mix_buf.len());
        self.mix_buf[..clear_len].iter_mut().for_each(|s| *s = 0);
        for ch in &self.channels {
            ch.resample(&mut self.mix_buf, 0, oversampled_frames * 2, oversample_rate, self.interpolation);
        }
        for ch in &mut self.channels {
            ch.update_sample_idx(tick_len * 2, oversample_rate);
        }
        self.downsample(tick_len + MIX_MARGIN - 1);
        self.volume_ramp(tick_len);
    }

    /// 2:1 downsampling with a simple 3-tap (1/4, 1/2, 1/4) anti-aliasing
    /// filter, done in place at the head of `mix_buf`. `count` output
    /// frames are produced; the buffer must hold `count * 2 + 1` input
    /// stereo frames.
    fn downsample(&mut self, count: i32) {
        let out_len = (count * 2) as usize;
        let mut in_idx = 0usize;
        let mut out_idx = 0usize;
        while out_idx < out_len {
            self.mix_buf[out_idx] =
                (self.mix_buf[in_idx] >> 2) + (self.mix_buf[in_idx + 2] >> 1) + (self.mix_buf[in_idx + 4] >> 2);
            self.mix_buf[out_idx + 1] =
                (self.mix_buf[in_idx + 1] >> 2) + (self.mix_buf[in_idx + 3] >> 1) + (self.mix_buf[in_idx + 5] >> 2);
            in_idx += 4;
            out_idx += 2;
        }
    }

    /// Cross-fades the head of the freshly downsampled tick against the
    /// tail carried over from the previous tick, masking the volume-step
    /// discontinuity at tick boundaries, then stashes this tick's own tail
    /// as the ramp source for the next one.
    fn volume_ramp(&mut self, tick_len: i32) {
        let ramp_rate = 256 * 2048 / self.sample_rate;
        let mut idx = 0usize;
        let mut a1 = 0i32;
        while a1 < 256 {
            let a2 = 256 - a1;
            self.mix_buf[idx] = (self.mix_buf[idx] * a1 + self.ramp_buf[idx] * a2) >> 8;
            self.mix_buf[idx + 1] = (self.mix_buf[idx + 1] * a1 + self.ramp_buf[idx + 1] * a2) >> 8;
            idx += 2;
            a1 += ramp_rate;
        }
        let tail_start = (tick_len * 2) as usize;
        self.ramp_buf.copy_from_slice(&self.mix_buf[tail_start..tail_start + 128]);
    }

    /// Advances exactly one tick: row dispatch on tick 0, effect dispatch
    /// (vibrato/slides/envelopes) on every other tick. Returns `false` once
    /// playback runs off the end of a non-looping song.
    fn do_tick(&mut self) -> bool {
        self.tick -= 1;
        if self.tick <= 0 {
            self.tick = self.speed;
            if self.pattern_delay > 0 {
                self.pattern_delay -= 1;
            } else if !self.do_row() {
                return false;
            }
        } else {
            for ch in &mut self.channels {
                ch.tick(&mut self.global_vol);
            }
        }
        true
    }

    /// Dispatches the notes of the current row: triggers, per-row effect
    /// setup, and the row/position navigation effects (break, jump, loop,
    /// delay). Renormalizes legacy MOD effect encodings into the shared
    /// effect space before dispatch.
    fn do_row(&mut self) -> bool {
        if self.breakpoint {
            self.breakpoint = false;
            return self.advance_position();
        }
        let pattern = self.module.pattern_for_sequence_pos(self.seq_pos);
        if self.row >= pattern.num_rows as i32 {
            self.row = 0;
            if !self.advance_position() {
                return false;
            }
        }
        let pattern = self.module.pattern_for_sequence_pos(self.seq_pos);
        let num_channels = self.module.num_channels;
        let mut jump_to: Option<usize> = None;
        let mut break_to_row: Option<i32> = None;
        let mut note = Note::default();
        for (chan_idx, channel) in self.channels.iter_mut().enumerate() {
            let index = self.row as usize * num_channels + chan_idx;
            pattern.get_note(index, &mut note);
            renormalise_effect(&mut note);
            match note.effect {
                // A jump/break on a row inside an active pattern-loop group
                // (`pl_count >= 0`) is suppressed — the loop must finish
                // replaying its rows before normal sequencing resumes.
                0x0B | 0x94 if self.pl_count < 0 => jump_to = Some(note.param as usize),
                0x0D if self.pl_count < 0 => {
                    break_to_row = Some((note.param >> 4) * 10 + (note.param & 0xF));
                }
                // Pattern loop: MOD's `E6x` renormalises to this code (§ renormalise_effect).
                0x76 => {
                    let count = note.param & 0xF;
                    if count == 0 {
                        channel.set_pl_row(self.row);
                    } else if self.pl_count < 0 {
                        self.pl_count = count;
                        self.pl_row = channel.pl_row();
                    } else if self.pl_count > 0 {
                        self.pl_count -= 1;
                    }
                    if self.pl_count == 0 {
                        self.pl_count = -1;
                    } else if self.pl_count > 0 {
                        break_to_row = Some(self.pl_row);
                        jump_to = Some(self.seq_pos);
                    }
                }
                // Pattern delay: MOD's `EEx` renormalises to this code.
                0x7E => {
                    self.pattern_delay = note.param & 0xF;
                }
                _ => {}
            }
            channel.row(&note, &mut self.global_vol);
        }
        self.row += 1;
        if let Some(pos) = jump_to {
            self.seq_pos = if self.module.sequence_length == 0 {
                0
            } else {
                pos % self.module.sequence_length
            };
            self.row = break_to_row.unwrap_or(0).max(0);
        } else if let Some(r) = break_to_row {
            if !self.advance_position() {
                return false;
            }
            self.row = r.max(0);
        }
        true
    }

    fn advance_position(&mut self) -> bool {
        if self.module.sequence_length == 0 {
            return false;
        }
        self.seq_pos += 1;
        if self.seq_pos >= self.module.sequence_length {
            self.seq_pos = self.module.restart_pos;
            if self.seq_pos >= self.module.sequence_length {
                return false;
            }
        }
        true
    }

    /// Total sample count to render the whole song once, ignoring
    /// infinite pattern loops (a loop-back effect ends playback at the
    /// point it would otherwise repeat).
    pub fn song_duration(&mut self) -> i64 {
        self.set_sequence_pos(0);
        let mut total = 0i64;
        let mut scratch = vec![0i16; 4096];
        loop {
            let n = self.get_audio(&mut scratch);
            if n == 0 {
                break;
            }
            total += n as i64;
            if total > 1_000_000_000 {
                break;
            }
        }
        self.set_sequence_pos(0);
        total
    }

    /// Renders the whole song (from the current position) to raw
    /// little-endian s16 stereo PCM, for golden-master comparison or
    /// environments without an audio device. Leaves playback position
    /// at the song's end.
    pub fn dump(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0i16; 4096];
        let mut frames = 0i64;
        // A pattern-loop effect can repeat indefinitely; cap at ten
        // minutes of audio so a looping song still produces a finite dump.
        let max_frames = self.sample_rate as i64 * 600;
        loop {
            let n = self.get_audio(&mut buf);
            if n == 0 {
                break;
            }
            for sample in &buf[..n * 2] {
                out.extend_from_slice(&sample.to_le_bytes());
            }
            frames += n as i64;
            if frames >= max_frames {
                break;
            }
        }
        out
    }

    /// One-line transport snapshot, logged per row at `trace` level.
    pub fn transport_state(&self) -> String {
        format!(
            "seq_pos={} row={} tick={} speed={} tempo={} global_vol={}",
            self.seq_pos, self.row, self.tick, self.speed, self.tempo, self.global_vol
        )
    }
}

/// MOD's single-nibble effect space (0x0..0xF) and S3M's `param==0` global
/// retrigger quirk are folded into the wider XM-derived effect space the
/// channel/engine dispatch tables operate on, so downstream code only ever
/// switches on one set of effect codes.
fn renormalise_effect(note: &mut Note) {
    if note.effect == 0xE {
        note.effect = 0x70 | (note.param >> 4);
        note.param &= 0xF;
    } else if note.effect == 0x93 {
        note.effect = 0xF0 | (note.param >> 4);
        note.param &= 0xF;
    } else if note.effect == 0 && note.param > 0 {
        note.effect = 0x8A;
    }
}

#[cfg(test)]
mod tests;
