//! snapstronaut - Snapstronaut command line client
//!
//! Signs in, shows the dashboard, completes tasks with a photo proof, and
//! follows the ISS position feed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use snapstronaut::leaderboard::load_leaderboard;
use snapstronaut::models::{Artifact, SignupRequest};
use snapstronaut::store::{LoadStatus, MessageKind, ViewState};
use snapstronaut::track::{format_coordinate, Axis, TrackState};
use snapstronaut::{
    ClientConfig, Dashboard, FileCredentialStore, HttpBackend, OpenNotifyFeed, SessionGate,
    Tracker,
};

/// snapstronaut - complete space tasks, earn points for your team
#[derive(Parser, Debug)]
#[command(name = "snapstronaut")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding config.json, the token and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Platform API root, overrides config and environment
    #[arg(long)]
    api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        team: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show profile, pending tasks and recent completions
    Dashboard,

    /// Complete a pending task with a photo proof
    Complete {
        /// Pending task id
        #[arg(long)]
        task: u32,
        /// Image file to upload
        #[arg(long)]
        file: PathBuf,
    },

    /// Team points, highest first
    Leaderboard,

    /// Follow the ISS position
    Track {
        /// Stop after this many successful updates
        #[arg(long)]
        updates: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(ClientConfig::default_data_dir);
    let mut config = ClientConfig::load(&data_dir).context("Failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    rolling_logger::init_logger_with_level(config.log_dir(), "snapstronaut", cli.log_level)
        .context("Failed to initialize logging")?;
    tracing::info!("Using API at {}", config.api_base_url);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let result = runtime.block_on(run(cli.command, config));
    if let Err(e) = &result {
        if let Some(line) = log_failure(e) {
            eprintln!("{}", line);
        }
    }
    result
}

/// Send a fatal error to the log file. Returns the line for stderr when the log is unavailable.
fn log_failure(error: &anyhow::Error) -> Option<String> {
    rolling_logger::error(&format!("{:#}", error))
        .err()
        .map(|log_error| format!("Could not write to the log ({}): {:#}", log_error, error))
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let gate = SessionGate::new(Arc::new(FileCredentialStore::new(config.credential_path())));

    match command {
        Commands::Login { email, password } => {
            gate.sign_in(backend.as_ref(), &email, &password).await?;
            println!("Logged in as {}", email);
        }
        Commands::Register {
            email,
            password,
            username,
            team,
        } => {
            let signup = SignupRequest {
                email,
                password,
                username,
                team_name: team,
            };
            gate.register(backend.as_ref(), &signup).await?;
            println!("Registration successful! Please log in.");
        }
        Commands::Logout => {
            gate.revoke()?;
            println!("Logged out");
        }
        Commands::Dashboard => {
            let dashboard = Dashboard::new(backend, gate, &config);
            let status = dashboard.mount().await;
            finish_view(status, &dashboard.snapshot())?;
        }
        Commands::Complete { task, file } => {
            let artifact = Artifact::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let dashboard = Dashboard::new(backend, gate, &config);
            let status = dashboard.mount().await;
            if status != LoadStatus::Ready {
                return finish_view(status, &dashboard.snapshot());
            }

            dashboard.select_task(task)?;
            dashboard.attach_file(artifact)?;
            let result = dashboard.submit_completion().await;
            let state = dashboard.snapshot();
            if let Some(message) = &state.message {
                println!("{}", message.text);
            }
            if state.status == LoadStatus::SignedOut {
                anyhow::bail!("Session expired, please log in again");
            }
            result?;
            print_dashboard(&state);
        }
        Commands::Leaderboard => {
            let teams = load_leaderboard(backend.as_ref(), &gate).await?;
            println!("{:<4} {:<24} {:>8}", "Rank", "Team", "Points");
            for (rank, team) in teams.iter().enumerate() {
                println!("{:<4} {:<24} {:>8}", rank + 1, team.team_name, team.total_points);
            }
        }
        Commands::Track { updates } => {
            let tracker = Tracker::new(
                Arc::new(OpenNotifyFeed::new(config.feed_url.clone())),
                config.poll_interval(),
            );
            track(&tracker, updates).await;
        }
    }
    Ok(())
}

fn finish_view(status: LoadStatus, state: &ViewState) -> Result<()> {
    match status {
        LoadStatus::Ready => {
            print_dashboard(state);
            Ok(())
        }
        LoadStatus::SignedOut => anyhow::bail!("Not logged in, run `snapstronaut login` first"),
        LoadStatus::Unavailable | LoadStatus::Loading => {
            let text = state
                .message
                .as_ref()
                .map(|m| m.text.clone())
                .unwrap_or_else(|| "Dashboard unavailable".to_string());
            anyhow::bail!(text)
        }
    }
}

fn print_dashboard(state: &ViewState) {
    if let Some(profile) = &state.profile {
        println!("{}", profile.message);
        if !profile.user_since.is_empty() {
            println!("Member since {}", profile.user_since);
        }
    }

    println!();
    println!("Pending tasks ({} points available)", state.total_pending_points());
    if state.pending.is_empty() {
        println!("  none");
    }
    for task in &state.pending {
        println!("  [{}] {} ({} pts)", task.task_id, task.task_name, task.points);
        if let Some(description) = &task.description {
            println!("      {}", description);
        }
    }

    println!();
    println!("Recently completed");
    if state.completed.is_empty() {
        println!("  none");
    }
    for record in &state.completed {
        println!(
            "  {} {}",
            record.completed_at.format(snapstronaut::models::SERVER_TIME_FORMAT),
            record.task_name
        );
        if let Some(url) = &record.photo_url {
            println!("      {}", url);
        }
    }

    if let Some(message) = &state.message {
        if message.kind == MessageKind::Error {
            eprintln!("{}", message.text);
        }
    }
}

async fn track(tracker: &Tracker, updates: Option<u64>) {
    let mut rx = tracker.subscribe();
    let printer = async {
        let mut seen = 0;
        while rx.changed().await.is_ok() {
            let state: TrackState = rx.borrow_and_update().clone();
            if let Some(error) = &state.error {
                eprintln!("{}", error);
            } else if let Some(position) = state.position {
                println!(
                    "{}  {}  {}",
                    position.timestamp.format("%H:%M:%S"),
                    format_coordinate(position.latitude, Axis::Latitude),
                    format_coordinate(position.longitude, Axis::Longitude)
                );
            }
            if state.updates != seen {
                seen = state.updates;
                if updates.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    };

    let shutdown = async {
        tokio::select! {
            _ = printer => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    };
    tracker.run(shutdown).await;
}
