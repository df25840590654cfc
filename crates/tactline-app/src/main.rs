//! Tactline - headless arrangement tool
//!
//! Entry point: loads configuration, sets up logging and runs one
//! command against an arrangement document.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tactline_audio::{AudioEngine, PlaybackEvent};
use tactline_core::{Ticks, TimelineConfig};
use tactline_timeline::{ArrangementFile, TrackContainer, TrackType};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: tactline <command> <file> [args]

commands:
  new <file> [name]          write a small demo arrangement
  info <file>                list tracks and blocks
  insert-tact <file> <tact>  insert one tact on every track
  remove-tact <file> <tact>  remove one tact on every track
  play <file> [passes]       run playback and report started blocks

TACTLINE_CONFIG may point to a JSON configuration file.";

fn main() -> Result<()> {
    let config = load_config()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Tactline starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(command), Some(file)) = (args.first(), args.get(1)) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    let path = PathBuf::from(file);
    let extra = args.get(2).map(String::as_str);

    match command.as_str() {
        "new" => write_demo(&path, extra.unwrap_or("Demo"), &config),
        "info" => print_info(&path, &config),
        "insert-tact" => edit_tacts(&path, extra, true, &config),
        "remove-tact" => edit_tacts(&path, extra, false, &config),
        "play" => play(&path, extra, &config),
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn load_config() -> Result<TimelineConfig> {
    match std::env::var_os("TACTLINE_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            TimelineConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => Ok(TimelineConfig::default()),
    }
}

fn open(path: &Path, container: &mut TrackContainer) -> Result<String> {
    let file = ArrangementFile::load_from_file(path)
        .with_context(|| format!("reading arrangement {}", path.display()))?;
    file.apply(container);
    info!("Loaded arrangement '{}' from {:?}", file.name, path);
    Ok(file.name)
}

fn save(path: &Path, name: &str, container: &TrackContainer) -> Result<()> {
    ArrangementFile::capture(name, container)
        .save_to_file(path)
        .with_context(|| format!("writing arrangement {}", path.display()))?;
    info!("Saved arrangement to {:?}", path);
    Ok(())
}

fn write_demo(path: &Path, name: &str, config: &TimelineConfig) -> Result<()> {
    let mut container = TrackContainer::new(Default::default(), config);

    let lead = container.create_track(TrackType::Instrument);
    for tact in [0, 2, 4] {
        container.create_block(lead, Ticks::from_tacts(tact));
    }
    let beats = container.create_track(TrackType::BeatBassline);
    for tact in 0..4 {
        container.create_block(beats, Ticks::from_tacts(tact));
    }
    let volume = container.create_track(TrackType::Automation);
    if let Some(block) = container.create_block(volume, Ticks::ZERO) {
        container.resize_block(block, Ticks::from_tacts(4));
    }

    save(path, name, &container)
}

fn print_info(path: &Path, config: &TimelineConfig) -> Result<()> {
    let mut container = TrackContainer::new(Default::default(), config);
    let name = open(path, &mut container)?;

    println!("{} ({} tacts)", name, container.length());
    for (index, track) in container.tracks().iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:<22} {:?}",
            index,
            track.name(),
            track.kind().node_name(),
            track.state()
        );
        for block in track.blocks_in_range(Ticks::ZERO, track.end_position()) {
            println!(
                "      {} .. {}  {}{}",
                block.start_position(),
                block.end_position(),
                block.content().node_name(),
                if block.is_muted() { " (muted)" } else { "" }
            );
        }
    }
    Ok(())
}

fn edit_tacts(path: &Path, tact: Option<&str>, insert: bool, config: &TimelineConfig) -> Result<()> {
    let Some(tact) = tact else {
        bail!("missing tact number\n\n{}", USAGE);
    };
    let tact: i64 = tact.parse().with_context(|| format!("invalid tact '{}'", tact))?;

    let mut container = TrackContainer::new(Default::default(), config);
    let name = open(path, &mut container)?;
    if insert {
        container.insert_tact(Ticks::from_tacts(tact));
    } else {
        container.remove_tact(Ticks::from_tacts(tact));
    }
    save(path, &name, &container)
}

fn play(path: &Path, passes: Option<&str>, config: &TimelineConfig) -> Result<()> {
    let passes: usize = match passes {
        Some(n) => n.parse().with_context(|| format!("invalid pass count '{}'", n))?,
        None => 32,
    };

    let mut engine = AudioEngine::new(config);
    let mut container = engine.create_container(config);
    open(path, &mut container)?;

    let rx = engine.play()?;
    let mut seen = 0;
    for event in rx.iter() {
        if let PlaybackEvent::Pass(pass) = event {
            for block in &pass.started {
                println!("{}  start {}", pass.window.start, block.block);
            }
            seen += 1;
            if seen >= passes {
                break;
            }
        }
    }
    engine.stop();
    Ok(())
}
