use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use modplayer::{Engine, FormatRegistry, Interpolation as EngineInterpolation};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpArg {
    Nearest,
    Linear,
    Sinc,
}

impl From<InterpArg> for EngineInterpolation {
    fn from(value: InterpArg) -> Self {
        match value {
            InterpArg::Nearest => EngineInterpolation::Nearest,
            InterpArg::Linear => EngineInterpolation::Linear,
            InterpArg::Sinc => EngineInterpolation::Sinc,
        }
    }
}

/// CLI tracker-music player
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The module file to play (.mod, .s3m, .xm)
    path: PathBuf,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    rate: i32,

    /// Resampling quality
    #[arg(long, value_enum, default_value = "linear")]
    interp: InterpArg,

    /// Start at this position in the song's pattern sequence
    #[arg(long, default_value_t = 0)]
    start_pos: usize,

    /// Render to a raw little-endian s16 stereo PCM file instead of playing live
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args) {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&args.path)?;
    let module = FormatRegistry::default().decode(&data)?;
    tracing::info!(song = %module.song_name, channels = module.num_channels, "loaded module");

    let mut engine = Engine::new(&module, args.rate)?;
    engine.set_interpolation(args.interp.into());
    engine.set_sequence_pos(args.start_pos);

    if let Some(out_path) = &args.dump {
        let pcm = engine.dump();
        tracing::info!(path = %out_path.display(), bytes = pcm.len(), "writing PCM dump");
        fs::write(out_path, pcm)?;
        return Ok(());
    }

    play_live(engine, args.rate)
}

fn play_live(engine: Engine<'_>, rate: i32) -> Result<(), Box<dyn std::error::Error>> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or("no output device available")?;
    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(rate as u32),
        buffer_size: cpal::BufferSize::Default,
    };

    let song_ended = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(Mutex::new(engine));

    let callback_engine = engine.clone();
    let callback_ended = song_ended.clone();
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [i16], _| {
            let mut engine = callback_engine.lock().expect("engine mutex poisoned");
            let n = engine.get_audio(data);
            for sample in &mut data[n * 2..] {
                *sample = 0;
            }
            if n == 0 {
                callback_ended.store(true, Ordering::Relaxed);
            }
        },
        move |err| tracing::error!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;

    while !song_ended.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(200));
        tracing::trace!("{}", engine.lock().expect("engine mutex poisoned").transport_state());
    }
    Ok(())
}
