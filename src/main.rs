//! Camera Session CLI
//!
//! Replays a flip/record script against the mock camera backend to
//! demonstrate the session lifecycle: permission, preview binding, lens
//! flips while recording, and disposal.

use camera_session::{
    camera::{AckMode, LensFacing, MockBackend, StaticPermissions},
    config::FileConfig,
    session::{control, CameraSessionController, SessionNotice},
    MetricsRegistry,
};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-session", version, about = "Camera session lifecycle demo")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lens to start on (overrides the config file).
    #[arg(short, long)]
    facing: Option<LensFacing>,

    /// Comma-separated steps: `flip` or `record` (toggles recording).
    #[arg(short, long, default_value = "record,flip,flip,record")]
    script: String,

    /// Simulate a device without a front camera.
    #[arg(long)]
    no_front_camera: bool,

    /// Simulate the user denying camera permission.
    #[arg(long)]
    deny_permission: bool,

    /// Print Prometheus metrics when done.
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Flip,
    Record,
}

fn parse_script(script: &str) -> Result<Vec<Step>, String> {
    script
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "flip" => Ok(Step::Flip),
            "record" => Ok(Step::Record),
            other => Err(format!("unknown step '{}'", other)),
        })
        .collect()
}

fn drain_notices(notices: &mut broadcast::Receiver<SessionNotice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice {
            SessionNotice::RecordingStarted(id) => info!(recording = %id, "Recording started"),
            SessionNotice::RecordingFinalized(id) => info!(recording = %id, "Recording saved"),
            SessionNotice::Error(e) => warn!(error = %e, "Session error"),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let steps = match parse_script(&cli.script) {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("Invalid script: {}", e);
            std::process::exit(2);
        }
    };

    info!("Camera Session v{}", camera_session::VERSION);
    info!("This is a demonstration using a mock camera backend");

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let (sink, inbox) = control::channel();
    let mut backend = MockBackend::new()
        .with_ack_mode(AckMode::Posted)
        .with_event_sink(sink);
    if cli.no_front_camera {
        backend = backend.without_lens(LensFacing::Front);
    }
    let permissions = if cli.deny_permission {
        StaticPermissions::denied()
    } else {
        StaticPermissions::granted()
    };

    let controller = CameraSessionController::with_config(backend, permissions, &config.session);
    let (session, task) = inbox.spawn(controller);
    let mut notices = session.subscribe();

    if let Err(e) = session.request_permission().await {
        error!("{}", e);
        let _ = session.dispose().await;
        std::process::exit(1);
    }

    let facing = cli.facing.unwrap_or(config.session.initial_facing);
    if let Err(e) = session.start_session(facing).await {
        error!("Failed to start camera: {}", e);
        let _ = session.dispose().await;
        std::process::exit(1);
    }

    for step in steps {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, ending session");
            break;
        }

        let result = match step {
            Step::Flip => session.flip().await,
            Step::Record => {
                session
                    .toggle_recording(config.output.target(Utc::now()))
                    .await
            }
        };
        match result {
            Ok(outcome) => info!(?step, ?outcome, "Step applied"),
            Err(e) => warn!(?step, "Step failed: {}", e),
        }
        drain_notices(&mut notices);
    }

    let snapshot = match session.dispose().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to dispose session: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = task.await {
        warn!("Control loop ended abnormally: {}", e);
    }
    drain_notices(&mut notices);

    let counters = snapshot.counters;
    info!(
        "Session ended on {} lens: {} binds, {} bind failures, {} recordings",
        snapshot.facing, counters.binds, counters.bind_failures, counters.recordings_started
    );

    if cli.metrics {
        match MetricsRegistry::new() {
            Ok(registry) => {
                registry.update(&snapshot);
                match registry.encode() {
                    Ok(text) => print!("{}", text),
                    Err(e) => warn!("Failed to encode metrics: {}", e),
                }
            }
            Err(e) => warn!("Failed to create metrics registry: {}", e),
        }
    }
}
