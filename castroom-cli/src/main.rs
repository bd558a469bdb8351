use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;

use castroom_core::{BrokerConfig, RoomCode, share_link};
use castroom_session::{
    DummyCaptureSource, DummySink, HostCommand, HostSession, InteractionFlag, LoopbackBroker,
    Notice, NoticeAction, NoticeKind, Notifier, VideoSink, ViewerCommand, ViewerSession,
};

#[derive(Parser)]
#[command(name = "castroom")]
#[command(about = "Peer-to-peer screen sharing engine, demo driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a host and viewers against the in-process broker.
    Demo {
        #[arg(long, default_value_t = 1)]
        viewers: usize,

        /// Skip the interactive sharing prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Validate a room code and print its share link.
    Link {
        #[arg(long, default_value = "https://castroom.app")]
        origin: String,

        /// Room code; prompted for when omitted.
        code: Option<String>,
    },
}

/// Prints engine notices the way a page would toast them.
struct PrintNotifier {
    role: String,
}

impl PrintNotifier {
    fn new(role: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { role: role.into() })
    }
}

#[async_trait]
impl Notifier for PrintNotifier {
    async fn notify(&self, notice: Notice) {
        let title = match notice.kind {
            NoticeKind::Info => notice.title.green().bold(),
            NoticeKind::Progress => notice.title.yellow().bold(),
            NoticeKind::Destructive => notice.title.red().bold(),
        };
        println!("  [{}] {}: {}", self.role.cyan(), title, notice.body);
        if notice.action == Some(NoticeAction::StartSharing) {
            println!("  [{}] {}", self.role.cyan(), "(accept to start sharing)".dimmed());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { viewers, yes } => run_demo(viewers, yes).await,
        Commands::Link { origin, code } => run_link(&origin, code),
    }
}

fn run_link(origin: &str, code: Option<String>) -> Result<()> {
    let input = match code {
        Some(code) => code,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Enter room code")
            .interact_text()
            .context("Failed to read room code")?,
    };

    match RoomCode::parse(&input) {
        Ok(code) => {
            println!("{} {}", "Room code:".green().bold(), code);
            println!("{} {}", "Share link:".green().bold(), share_link(origin, &code));
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {err}", "Invalid room code:".red().bold());
            std::process::exit(1);
        }
    }
}

async fn run_demo(viewer_count: usize, yes: bool) -> Result<()> {
    println!("{}", "🖥  Starting castroom demo...".green().bold());

    let broker = Arc::new(LoopbackBroker::new());
    let capture = Arc::new(DummyCaptureSource::new());

    let (host, host_session) = HostSession::new(
        broker.clone(),
        BrokerConfig::default(),
        capture.clone(),
        PrintNotifier::new("host"),
    );
    let host_task = tokio::spawn(host_session.run());

    let mut host_status = host.status();
    host_status
        .wait_for(|status| !status.room.is_unassigned())
        .await
        .context("Host never became ready")?;
    let room_code = host_status.borrow().room.to_string();

    println!("{} {}", "Room code:".cyan().bold(), room_code);
    println!(
        "{} {}",
        "Share link:".cyan().bold(),
        share_link("https://castroom.app", &RoomCode::parse(&room_code)?)
    );

    let mut viewers = Vec::new();
    for index in 0..viewer_count {
        let sink = Arc::new(DummySink::new());
        // The common autoplay policy: unmuted playback needs a gesture.
        sink.set_reject_unmuted(true);

        let (handle, session) = ViewerSession::join(
            broker.clone(),
            BrokerConfig::default(),
            &room_code,
            sink.clone(),
            PrintNotifier::new(format!("viewer-{index}")),
            Arc::new(InteractionFlag::new()),
        )
        .context("Room code rejected")?;
        let task = tokio::spawn(session.run());
        viewers.push((handle, sink, task));
    }

    host_status
        .wait_for(|status| status.viewers.len() == viewer_count)
        .await
        .context("Viewers never joined")?;
    println!(
        "{} {} viewer(s) connected",
        "✓".green().bold(),
        viewer_count
    );

    let start = yes
        || dialoguer::Confirm::new()
            .with_prompt("Start sharing your screen?")
            .default(true)
            .interact()
            .unwrap_or(true);
    if !start {
        println!("{}", "Not sharing; ending session.".yellow());
        host.send(HostCommand::EndSession).await;
        host_task.await.ok();
        return Ok(());
    }

    host.send(HostCommand::StartCapture).await;

    for (handle, _, _) in &viewers {
        let mut status = handle.status();
        status
            .wait_for(|status| status.has_stream)
            .await
            .context("Viewer never received the stream")?;
    }
    println!("{} stream flowing to every viewer (muted)", "✓".green().bold());

    // First viewer unmutes, the way a user tap would.
    if let Some((handle, sink, _)) = viewers.first() {
        handle.send(ViewerCommand::ToggleMute).await;
        let mut status = handle.status();
        status
            .wait_for(|status| !status.playback.muted)
            .await
            .context("Viewer never unmuted")?;
        println!(
            "{} viewer-0 unmuted, playback {}",
            "✓".green().bold(),
            if sink.is_paused() { "paused" } else { "running" }
        );
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    // The browser's own "Stop sharing" affordance ends the track.
    println!("{}", "Ending capture from the browser side...".yellow());
    if let Some(track) = capture.last_video_track() {
        track.end_remotely();
    }
    host_status
        .wait_for(|status| !status.sharing)
        .await
        .context("Capture never ended")?;
    println!("{} outbound calls closed, viewers still connected", "✓".green().bold());

    for (handle, _, _) in &viewers {
        handle.send(ViewerCommand::Leave).await;
    }
    for (_, _, task) in viewers {
        task.await.ok();
    }
    host.send(HostCommand::EndSession).await;
    host_task.await.ok();

    println!("{}", "Demo finished.".green().bold());
    Ok(())
}
