use super::*;
use crate::module::Module;

#[test]
fn rejects_sample_rate_out_of_range() {
    let module = Module::blank();
    assert!(Engine::new(&module, 4000).is_err());
    assert!(Engine::new(&module, 200_000).is_err());
}

#[test]
fn blank_module_renders_silence_and_stops() {
    let module = Module::blank();
    let mut engine = Engine::new(&module, 44100).unwrap();
    let mut buf = vec![0i16; 4096];
    let mut total = 0usize;
    for _ in 0..200 {
        let n = engine.get_audio(&mut buf);
        total += n;
        if n == 0 {
            break;
        }
        assert!(buf[..n * 2].iter().all(|&s| s == 0));
    }
    assert!(total > 0);
}

#[test]
fn set_sequence_pos_resets_row_and_tick() {
    let module = Module::blank();
    let mut engine = Engine::new(&module, 44100).unwrap();
    let mut buf = vec![0i16; 256];
    engine.get_audio(&mut buf);
    engine.set_sequence_pos(0);
    assert_eq!(engine.row(), 0);
    assert_eq!(engine.sequence_pos(), 0);
}

#[test]
fn mix_buffer_length_shrinks_with_higher_sample_rate_relative_to_tempo() {
    let low = Engine::mix_buffer_length(8000);
    let high = Engine::mix_buffer_length(128000);
    assert!(high > low);
}

#[test]
fn renormalise_folds_legacy_mod_effects() {
    let mut note = Note { key: 0, instrument: 0, volume: 0, effect: 0xE, param: 0x61 };
    renormalise_effect(&mut note);
    assert_eq!(note.effect, 0x76);
    assert_eq!(note.param, 0x1);

    let mut note2 = Note { key: 0, instrument: 0, volume: 0, effect: 0, param: 5 };
    renormalise_effect(&mut note2);
    assert_eq!(note2.effect, 0x8A);
}

#[test]
fn transport_state_reports_initial_values() {
    let module = Module::blank();
    let engine = Engine::new(&module, 44100).unwrap();
    let text = engine.transport_state();
    assert!(text.contains("speed=6"));
    assert!(text.contains("tempo=125"));
}

#[test]
fn dump_produces_le_s16_stereo_pcm_bytes() {
    let module = Module::blank();
    let mut engine = Engine::new(&module, 44100).unwrap();
    let bytes = engine.dump();
    assert_eq!(bytes.len() % 4, 0);
}
