// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless timeline viewer.
//!
//! Opens a recording against the replay backend and drives a
//! [`TimelineSession`] from the command line. Everything it learns is
//! reported through `tracing`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replay_app_core::viewer::VIEWER_CONFIG_KEY;
use replay_app_core::{ConfigService, ViewerConfig};
use replay_client::RpcClient;
use replay_config_fs::FsConfigStore;
use replay_protocol::Location;
use replay_timeline::{
    LogpointHandler, LogpointMessage, PointLoading, SessionHandle, TimelineSession,
    TimelineStatus, UserCommand,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay timeline viewer (headless)")]
struct Args {
    /// Backend address; overrides the stored config
    #[arg(long)]
    dispatch: Option<String>,
    /// Directory holding viewer.json
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Recording to open
    recording_id: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report checkpoints, paints and duration discovered so far
    Summary {
        /// How long to collect push events before reporting
        #[arg(long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Play back to the end of the recording
    Play {
        /// Start at the last paint or mouse event before this time
        #[arg(long)]
        from_ms: Option<f64>,
        /// How long to collect push events before starting
        #[arg(long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Set a logpoint and report its messages until interrupted
    Logpoint {
        /// Script id of the location
        #[arg(long)]
        script_id: String,
        /// 1-based line
        #[arg(long)]
        line: u32,
        /// 0-based column
        #[arg(long, default_value_t = 0)]
        column: u32,
        /// Expression list to log, e.g. '"x is", x'
        #[arg(long)]
        text: String,
        /// Only log hits where this expression is truthy
        #[arg(long)]
        condition: Option<String>,
    },
}

/// Reports logpoint output through tracing.
struct TracingHandler;

impl LogpointHandler for TracingHandler {
    fn on_result(&self, message: LogpointMessage) {
        info!(
            log_group_id = %message.log_group_id,
            point = %message.point,
            time = message.time,
            values = ?message.values,
            "logpoint"
        );
    }

    fn on_point_loading(&self, loading: PointLoading) {
        debug!(log_group_id = %loading.log_group_id, point = %loading.point, time = loading.time, "logpoint hit");
    }

    fn clear_logpoint(&self, log_group_id: &str) {
        debug!(log_group_id, "logpoint cleared");
    }
}

fn load_config(args: &Args) -> Result<ViewerConfig> {
    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open config store")?;
    let mut config: ViewerConfig = ConfigService::new(store).load_or_init(VIEWER_CONFIG_KEY);
    if let Some(dispatch) = &args.dispatch {
        config.dispatch_address.clone_from(dispatch);
    }
    Ok(config)
}

async fn settle(wait_ms: u64) {
    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
}

async fn summary(handle: SessionHandle<RpcClient>, wait_ms: u64) -> Result<()> {
    settle(wait_ms).await;
    let session = handle.shutdown().await?;
    let view = session.view();
    info!(
        session_id = %session.session_id(),
        duration = view.duration,
        checkpoints = session.checkpoints().len(),
        recording_end_time = view.recording_end_time,
        paints = session.events().paints().len(),
        "recording summary"
    );
    Ok(())
}

async fn play(handle: SessionHandle<RpcClient>, from_ms: Option<f64>, wait_ms: u64) -> Result<()> {
    settle(wait_ms).await;
    let mut view = handle.view();
    if let Some(time) = from_ms {
        handle.send(UserCommand::SeekTime(time)).await?;
    }
    handle.send(UserCommand::Play).await?;
    let started = tokio::time::timeout(
        Duration::from_secs(5),
        view.wait_for(|v| v.status == TimelineStatus::Playing),
    )
    .await
    .is_ok_and(|waited| waited.is_ok());
    if !started {
        warn!("playback never reported as running");
        handle.shutdown().await?;
        return Ok(());
    }

    let mut last_paint = None;
    while view.changed().await.is_ok() {
        let current = view.borrow_and_update().clone();
        let paint = current
            .graphics
            .as_ref()
            .and_then(|g| g.screen.as_ref())
            .map(|screen| screen.hash.clone());
        if paint.is_some() && paint != last_paint {
            debug!(time = current.current_time, hash = ?paint, "frame");
            last_paint = paint;
        }
        if current.status != TimelineStatus::Playing {
            info!(point = %current.execution_point, time = current.current_time, "playback finished");
            break;
        }
    }
    handle.shutdown().await?;
    Ok(())
}

async fn tail_logpoint(
    handle: SessionHandle<RpcClient>,
    location: Location,
    text: &str,
    condition: Option<&str>,
) -> Result<()> {
    let analysis_id = handle
        .analyses()
        .set_logpoint("cli", location, text, condition)
        .await?;
    info!(%analysis_id, "logpoint set; interrupt to stop");
    tokio::signal::ctrl_c().await.context("install ctrl-c handler")?;
    handle.analyses().remove_logpoint("cli");
    handle.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = load_config(&args)?;
    let (client, events, link) = RpcClient::connect(&config.dispatch_address)
        .await
        .with_context(|| format!("connect to {}", config.dispatch_address))?;
    let session = TimelineSession::open(
        client,
        &args.recording_id,
        config,
        Arc::new(TracingHandler),
    )
    .await?;
    let handle = session.spawn(events);

    match args.cmd {
        Command::Summary { wait_ms } => summary(handle, wait_ms).await?,
        Command::Play { from_ms, wait_ms } => play(handle, from_ms, wait_ms).await?,
        Command::Logpoint {
            script_id,
            line,
            column,
            text,
            condition,
        } => {
            let location = Location {
                script_id,
                line,
                column,
            };
            tail_logpoint(handle, location, &text, condition.as_deref()).await?;
        }
    }

    link.abort();
    if let Err(err) = link.await {
        if !err.is_cancelled() {
            warn!(?err, "link task failed");
        }
    }
    Ok(())
}
