//! End-to-end scenarios exercising the sequencer/mixer as a whole, built
//! from hand-assembled modules rather than decoded files.

use modplayer::fixed::C2Rate;
use modplayer::instrument::Instrument;
use modplayer::module::Module;
use modplayer::pattern::{Note, Pattern};
use modplayer::sample::Sample;
use modplayer::{Engine, Interpolation};

fn square_wave_instrument(c2_rate: i32, period_samples: usize, cycles: usize) -> Instrument {
    let mut raw = Vec::with_capacity(period_samples * cycles);
    for i in 0..period_samples * cycles {
        let phase = i % period_samples;
        raw.push(if phase < period_samples / 2 { 16383i16 } else { -16384 });
    }
    let mut sample = Sample { volume: 64, panning: -1, rel_note: 0, fine_tune: 0, ..Sample::default() };
    sample.c2_rate = C2Rate(c2_rate);
    sample.set_sample_data(&raw, 0, raw.len() as i32, false);

    Instrument {
        name: "square".into(),
        vibrato_type: 0,
        vibrato_sweep: 0,
        vibrato_depth: 0,
        vibrato_rate: 0,
        volume_fade_out: 0,
        samples: vec![sample],
        key_to_sample: [0usize; 97],
        volume_envelope: modplayer::envelope::Envelope::default(),
        panning_envelope: modplayer::envelope::Envelope::default(),
    }
}

fn base_module(num_channels: usize, patterns: Vec<Pattern>, instrument: Instrument) -> Module {
    let sequence_length = patterns.len();
    Module {
        song_name: "scenario".into(),
        num_channels,
        num_instruments: 1,
        sequence_length,
        restart_pos: 0,
        sequence: (0..sequence_length).collect(),
        patterns,
        instruments: vec![Instrument::default_instrument(), instrument],
        default_panning: vec![128; num_channels],
        linear_periods: false,
        fast_vol_slides: false,
        c2_rate: C2Rate(8287),
        gain: 64,
        default_gvol: 64,
        default_speed: 6,
        default_tempo: 125,
    }
}

fn set_row(pattern: &mut Pattern, row: usize, channel: usize, num_channels: usize, note: Note) {
    pattern.set_note(row * num_channels + channel, &note);
}

/// Counts zero crossings in a mono channel extracted from interleaved
/// stereo i16 and converts to an estimated frequency.
fn dominant_frequency(stereo: &[i16], sample_rate: f64) -> f64 {
    let mono: Vec<i32> = stereo.chunks_exact(2).map(|f| f[0] as i32).collect();
    let mut crossings = 0usize;
    for w in mono.windows(2) {
        if (w[0] >= 0) != (w[1] >= 0) {
            crossings += 1;
        }
    }
    let duration = mono.len() as f64 / sample_rate;
    (crossings as f64 / 2.0) / duration
}

#[test]
fn scenario_1_blank_module_is_silent_with_expected_tick_length() {
    let module = base_module(4, vec![Pattern::new(4, 1)], square_wave_instrument(8287, 16, 4));
    let mut engine = Engine::new(&module, 48000).unwrap();
    assert_eq!(engine.tick_len(), 960);

    let mut buf = vec![0i16; 1920];
    engine.get_audio(&mut buf);
    assert!(buf.iter().all(|&s| s == 0));
}

#[test]
fn scenario_2_pure_tone_frequency_matches_within_half_percent() {
    let num_channels = 1;
    let mut pattern = Pattern::new(num_channels, 64);
    set_row(
        &mut pattern,
        0,
        0,
        num_channels,
        Note { key: 49, instrument: 1, volume: 0, effect: 0, param: 0 },
    );
    let module = base_module(num_channels, vec![pattern], square_wave_instrument(8287, 16, 200));
    let mut engine = Engine::new(&module, 44100).unwrap();
    engine.set_interpolation(Interpolation::Linear);

    let mut buf = vec![0i16; 44100 * 2];
    engine.get_audio(&mut buf);

    let expected = 8287.0 / 16.0;
    let measured = dominant_frequency(&buf, 44100.0);
    let error = (measured - expected).abs() / expected;
    assert!(error < 0.005, "expected ~{expected} Hz, measured {measured} Hz (error {error})");
}

#[test]
fn scenario_3_tone_portamento_converges_and_holds() {
    let num_channels = 1;
    let num_rows = 24;
    let mut pattern = Pattern::new(num_channels, num_rows);
    set_row(&mut pattern, 0, 0, num_channels, Note { key: 49, instrument: 1, volume: 0, effect: 0, param: 0 });
    set_row(&mut pattern, 1, 0, num_channels, Note { key: 61, instrument: 0, volume: 0, effect: 0x03, param: 0x20 });
    for row in 2..num_rows {
        set_row(&mut pattern, row, 0, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x03, param: 0x20 });
    }
    let module = base_module(num_channels, vec![pattern], square_wave_instrument(8287, 16, 400));
    let mut engine = Engine::new(&module, 44100).unwrap();

    // Render past the point the glide must have converged, then sample a
    // short window near the end of the pattern to measure the held pitch.
    let mut discard = vec![0i16; 44100 * 2];
    engine.get_audio(&mut discard);
    let mut tail = vec![0i16; (44100.0 * 0.3) as usize * 2];
    engine.get_audio(&mut tail);

    let expected = 8287.0 / 16.0 * 2.0; // one octave above the starting key
    let measured = dominant_frequency(&tail, 44100.0);
    let error = (measured - expected).abs() / expected;
    assert!(error < 0.01, "expected ~{expected} Hz held, measured {measured} Hz (error {error})");
}

#[test]
fn scenario_4_pattern_loop_repeats_rows_three_times_total() {
    let num_channels = 1;
    let mut pattern = Pattern::new(num_channels, 4);
    // Row 1 marks the loop start; row 3 loops back to it twice more.
    set_row(&mut pattern, 1, 0, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x76, param: 0 });
    set_row(&mut pattern, 3, 0, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x76, param: 2 });
    let mut module = base_module(num_channels, vec![pattern], square_wave_instrument(8287, 16, 4));
    module.restart_pos = 1; // single pass through the sequence, then the song ends
    let mut engine = Engine::new(&module, 44100).unwrap();

    let mut rows_seen = Vec::new();
    let mut buf = vec![0i16; 64];
    // Sample the row counter once per tick until the song ends (one pattern,
    // no further sequence entries once the loop group exhausts itself).
    loop {
        let before = engine.row();
        let n = engine.get_audio(&mut buf);
        if n == 0 {
            break;
        }
        rows_seen.push(before);
        if rows_seen.len() > 10_000 {
            panic!("pattern loop did not terminate");
        }
    }
    let entries_into_row1 = rows_seen.windows(2).filter(|w| w[0] != 1 && w[1] == 1).count()
        + if rows_seen.first() == Some(&1) { 1 } else { 0 };
    assert_eq!(entries_into_row1, 3, "rows 1..=3 should play a total of three times");
}

#[test]
fn scenario_5_break_and_jump_are_ignored_inside_active_loop() {
    // Two channels so the loop-back decision and a break land on the same
    // row: channel 0 carries the loop effect, channel 1 a pattern break.
    // Channels are scanned in index order within a row, so by the time the
    // break is evaluated `pl_count` already reflects whatever the loop
    // effect just did to it.
    let num_channels = 2;
    let mut loop_pattern = Pattern::new(num_channels, 4);
    set_row(&mut loop_pattern, 1, 0, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x76, param: 0 });
    set_row(&mut loop_pattern, 3, 0, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x76, param: 2 });
    // A pattern break sitting on the same row as the loop-back decision must
    // not fire while the loop is still repeating; it only takes effect once
    // the loop group has exhausted its repeat count.
    set_row(&mut loop_pattern, 3, 1, num_channels, Note { key: 0, instrument: 0, volume: 0, effect: 0x0D, param: 0 });
    let tail_pattern = Pattern::new(num_channels, 1);
    let mut module = base_module(num_channels, vec![loop_pattern, tail_pattern], square_wave_instrument(8287, 16, 4));
    module.restart_pos = 2; // one pass through both sequence entries, then the song ends
    let mut engine = Engine::new(&module, 44100).unwrap();

    let mut rows_seen = Vec::new();
    let mut seq_positions_seen = Vec::new();
    let mut buf = vec![0i16; 64];
    for _ in 0..10_000 {
        let before_row = engine.row();
        let before_seq = engine.sequence_pos();
        let n = engine.get_audio(&mut buf);
        if n == 0 {
            break;
        }
        rows_seen.push(before_row);
        seq_positions_seen.push(before_seq);
    }
    let entries_into_row1 = rows_seen.windows(2).filter(|w| w[0] != 1 && w[1] == 1).count()
        + if rows_seen.first() == Some(&1) { 1 } else { 0 };
    assert_eq!(
        entries_into_row1, 3,
        "the break on row 3 must stay suppressed until the loop group finishes its three passes"
    );
    assert!(
        seq_positions_seen.contains(&1),
        "once the loop group finishes, the break should advance past the single pattern into the next sequence entry"
    );
}

#[test]
fn scenario_6_sample_loop_wraps_into_range() {
    let num_channels = 1;
    let mut pattern = Pattern::new(num_channels, 64);
    set_row(&mut pattern, 0, 0, num_channels, Note { key: 49, instrument: 1, volume: 0, effect: 0, param: 0 });
    let mut instrument = square_wave_instrument(8287, 16, 10); // loop_length starts at 160 raw samples
    // Re-carve the sample with an explicit 50-sample loop starting at 100,
    // matching the scenario's literal loop geometry.
    let raw: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
    instrument.samples[0].set_sample_data(&raw, 100, 50, false);
    let module = base_module(num_channels, vec![pattern], instrument);
    let mut engine = Engine::new(&module, 44100).unwrap();

    let mut buf = vec![0i16; 10_000 * 2];
    let n = engine.get_audio(&mut buf);
    assert!(n > 0);
    // No direct access to the channel's internal sample index from here;
    // the behavioural proxy is that playback stays non-silent and bounded
    // (a wrap bug would either go silent or read out of the padded buffer).
    assert!(buf[..n * 2].iter().any(|&s| s != 0));
}
