//! Live assistant host
//!
//! Runs one assistant session against the configured backend and drives it
//! from line commands on stdin. Store updates are printed as they happen.

mod commands;
mod live_audio;
mod render;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use commands::{guess_mime, Command, HELP};
use lia_agent::{
    AssistantSession, RecordingOutcome, SessionDeps, StartOutcome, ToggleOutcome, TurnOutcome,
};
use lia_config::{load_settings, Settings};
use lia_gateway::{AssistantBackend, BackendGateway, FileUpload};
use lia_pipeline::AudioInput;
use lia_transport::WebSocketConnector;

const RECORDING_PUMP_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: LIA__ env vars > config/{env} > config/default > defaults
    let env = std::env::var("LIA_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting live assistant v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = %config.backend.base_url,
        live = %config.live_ws_url(),
        "Configuration loaded"
    );

    let backend: Arc<dyn AssistantBackend> = Arc::new(
        BackendGateway::from_config(&config.backend).context("failed to build backend client")?,
    );
    let connector = Arc::new(WebSocketConnector::from_settings(backend.clone(), &config));
    let input = select_input(&config);
    tracing::info!(input = input.name(), "Audio input selected");

    let deps = SessionDeps::new(backend, connector, &config).with_input(input.clone());
    let session = Arc::new(AssistantSession::new(deps, &config));

    let _printers = render::spawn_printers(&session);
    let _pump = session.spawn_event_pump();
    let _recording_pump = spawn_recording_pump(&session);

    session.load_memories().await;

    println!("{}", HELP);
    println!("Active scope: {}", session.active_scope());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            },
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(&session, &input, command).await {
            println!("error: {:#}", e);
        }
    }

    if session.is_live_active() {
        session.toggle_live().await;
    }
    tracing::info!("Session closed");
    Ok(())
}

async fn run_command(
    session: &Arc<AssistantSession>,
    input: &Arc<dyn AudioInput>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Say(text) => report_turn(session.send_text(&text).await),
        Command::Send => report_turn(session.submit_input().await),
        Command::Mode { mode, conversation } => {
            let conversation = conversation
                .unwrap_or_else(|| session.active_scope().conversation_id().to_string());
            let scope = session.set_active_scope(mode, &conversation);
            println!("Active scope: {} ({} messages)", scope, session.messages().len());
        },
        Command::Live => match session.toggle_live().await {
            ToggleOutcome::Connected(id) => {
                tracing::info!(connection = %id, "Live session started");
                live_audio::spawn_live_audio(session.clone(), input.clone());
            },
            ToggleOutcome::Disconnected => println!("Live session ended"),
            ToggleOutcome::Busy => println!("Live session is already changing state"),
            ToggleOutcome::Failed(_) => {},
        },
        Command::Record => match session.start_recording().await {
            StartOutcome::Started => println!("Recording, :stop to finish"),
            StartOutcome::AlreadyRecording => println!("Already recording"),
            StartOutcome::DeviceBusy => println!("The live session is using the microphone"),
            StartOutcome::Cancelled => println!("Recording cancelled"),
            StartOutcome::Failed(_) => {},
        },
        Command::Stop => match session.stop_recording().await {
            RecordingOutcome::Transcribed(text) => {
                println!("Input: {}", text);
                println!("(:send to submit)");
            },
            RecordingOutcome::NothingRecorded => println!("Nothing was recorded"),
            RecordingOutcome::TranscriptionFailed => println!("Input unchanged"),
        },
        Command::Attach { path, message } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let file = FileUpload::new(name, guess_mime(&path), data);
            report_turn(session.send_attachment(file, message.as_deref()).await);
        },
        Command::Where {
            latitude,
            longitude,
        } => {
            session.share_location(latitude, longitude).await;
        },
        Command::Memories => {
            let memories = session.load_memories().await;
            if memories.is_empty() {
                println!("No memories");
            }
            for memory in memories {
                println!("  [{}] {}", memory.id.as_deref().unwrap_or("-"), memory.content);
            }
        },
        Command::Remember(content) => {
            let saved = session.save_memory(&content).await.unwrap_or(false);
            println!("{}", if saved { "Saved" } else { "Could not save memory" });
        },
        Command::Forget(id) => {
            let deleted = session.delete_memory(&id).await;
            println!("{}", if deleted { "Deleted" } else { "Could not delete memory" });
        },
        Command::Session => match session.session_info().await {
            Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
            None => println!("Session info unavailable"),
        },
        Command::Delete(conversation) => {
            let removed = session.delete_conversation(&conversation);
            println!("Removed {} scope(s)", removed);
        },
        Command::Clear => session.clear_history(),
        Command::Reset => {
            let reset = session.reset_session().await;
            println!("{}", if reset { "Session reset" } else { "Reset failed" });
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {},
    }
    Ok(())
}

fn report_turn(outcome: TurnOutcome) {
    match outcome {
        TurnOutcome::Replied(_) | TurnOutcome::Silent => {},
        TurnOutcome::Ignored => println!("Nothing to send"),
        TurnOutcome::Failed(e) => println!("{}", e.user_message()),
    }
}

/// Drain microphone chunks into the active recording
fn spawn_recording_pump(session: &Arc<AssistantSession>) -> tokio::task::JoinHandle<()> {
    let session = Arc::downgrade(session);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RECORDING_PUMP_INTERVAL);
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                break;
            };
            if session.is_recording() {
                // Failures are reported through the session status
                let _ = session.pump_recording();
            }
        }
    })
}

#[cfg(feature = "audio-io")]
fn select_input(config: &Settings) -> Arc<dyn AudioInput> {
    Arc::new(lia_pipeline::CpalInput::new(&config.capture))
}

#[cfg(not(feature = "audio-io"))]
fn select_input(_config: &Settings) -> Arc<dyn AudioInput> {
    Arc::new(lia_pipeline::UnavailableInput)
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("lia={},lia_agent={},lia_transport={}", level, level, level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}
