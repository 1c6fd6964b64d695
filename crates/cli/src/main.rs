use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;

use doorguard_core::alerting::domain::alert_config::AlertConfig;
use doorguard_core::alerting::infrastructure::process_chime_player::ProcessChimePlayer;
use doorguard_core::detection::domain::object_detector::ObjectDetector;
use doorguard_core::detection::infrastructure::bytetrack_tracker::ByteTracker;
use doorguard_core::detection::infrastructure::onnx_person_detector::OnnxPersonDetector;
use doorguard_core::pipeline::watch_door_use_case::WatchDoorUseCase;
use doorguard_core::shared::constants::{
    DEFAULT_PLAYER_BIN, DETECT_MODEL_NAME, DETECT_MODEL_URL, TRACKER_MAX_LOST,
};
use doorguard_core::shared::model_resolver;
use doorguard_core::video::infrastructure::ffmpeg_stream_source::FfmpegStreamSource;

/// Watches a door camera and chimes while a person is at the door.
#[derive(Parser)]
#[command(name = "doorguard")]
struct Cli {
    /// Stream to watch (RTSP URL or any ffmpeg-readable source).
    #[arg(long, env = "STREAM_URI")]
    stream_uri: String,

    /// Seconds between two chimes while someone stays at the door.
    #[arg(long, default_value = "5.0")]
    cooldown: f64,

    /// Seconds between presence checks while the door is empty.
    #[arg(long, default_value = "0.5")]
    poll_interval: f64,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.25")]
    confidence: f64,

    /// Chime audio file (defaults to the bundled doorbell sound).
    #[arg(long)]
    sound: Option<PathBuf>,

    /// External audio player binary.
    #[arg(long, default_value = DEFAULT_PLAYER_BIN)]
    player: String,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let detector = build_detector(&cli)?;
    let source = Box::new(FfmpegStreamSource::new());

    let sound = match cli.sound {
        Some(path) => path,
        None => ProcessChimePlayer::bundled_sound_path()?,
    };
    let actuator = Box::new(ProcessChimePlayer::with_player(cli.player, sound));

    let config = AlertConfig::new(
        Duration::from_secs_f64(cli.cooldown),
        Duration::from_secs_f64(cli.poll_interval),
    );

    let use_case = WatchDoorUseCase::new(source, detector, actuator, config);

    let stop = use_case.stop_handle();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, shutting down");
        stop.store(true, Ordering::Relaxed);
    })?;

    use_case.run(&cli.stream_uri)?;
    log::info!("exiting");
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {DETECT_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        DETECT_MODEL_NAME,
        DETECT_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let tracker = ByteTracker::new(TRACKER_MAX_LOST);
    Ok(Box::new(OnnxPersonDetector::new(
        &model_path,
        tracker,
        cli.confidence,
    )?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.cooldown <= 0.0 {
        return Err(format!("Cooldown must be positive, got {}", cli.cooldown).into());
    }
    if cli.poll_interval <= 0.0 {
        return Err(format!("Poll interval must be positive, got {}", cli.poll_interval).into());
    }
    if let Some(ref sound) = cli.sound {
        if !sound.exists() {
            return Err(format!("Sound file not found: {}", sound.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
