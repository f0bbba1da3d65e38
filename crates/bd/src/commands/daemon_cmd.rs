//! `bd daemon` -- run the per-workspace daemon, or query a running one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use beads_daemon::flush::{sync_flush_fn, FlushScheduler, DEFAULT_FLUSH_DELAY};
use beads_daemon::lifecycle::{shutdown_signal, PidFile};
use beads_daemon::{run_daemon, DaemonOptions, EventBus, Handler};
use beads_storage::{SqliteStore, Storage};

use crate::cli::{DaemonArgs, DaemonCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;
use crate::rpc;

/// Execute the `bd daemon` command.
pub fn run(ctx: &RuntimeContext, args: &DaemonArgs) -> Result<()> {
    match &args.command {
        DaemonCommands::Run { tcp } => run_foreground(ctx, tcp.as_deref()),
        DaemonCommands::Status => status(ctx),
    }
}

fn run_foreground(ctx: &RuntimeContext, tcp: Option<&str>) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store: Arc<dyn Storage> = Arc::new(SqliteStore::open(workspace.paths.db_path())?);

    // Daemon logs go to .beads/daemon.log unless the operator asked for
    // stderr via --verbose.
    if !ctx.verbose {
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(workspace.paths.daemon_log_path())?;
        tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("BEADS_LOG").unwrap_or_else(|_| "info".to_owned()),
            )
            .with_writer(log)
            .with_ansi(false)
            .init();
    }

    let _pid = PidFile::acquire(workspace.paths.daemon_pid_path())
        .context("acquiring daemon.pid")?;

    let tcp_addr = tcp
        .map(str::to_owned)
        .or_else(|| workspace.config.daemon.tcp_addr.clone());
    let token = std::env::var("BEADS_DAEMON_TOKEN").ok();
    if tcp_addr.is_some() && token.is_none() {
        bail!("TCP requested but BEADS_DAEMON_TOKEN is not set");
    }

    let flush_delay = workspace
        .config
        .daemon
        .flush_delay_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_FLUSH_DELAY);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let flush = FlushScheduler::spawn(
            flush_delay,
            sync_flush_fn(
                store.clone(),
                workspace.paths.clone(),
                workspace.config.clone(),
                workspace.repo_root.clone(),
                ctx.actor.clone(),
            ),
        );
        let handler = Handler::new(store.clone(), EventBus::new(), Some(flush));

        let mut options = DaemonOptions::new(workspace.paths.socket_path());
        options.tcp_addr = tcp_addr;
        options.token = token;

        run_daemon(handler, options, shutdown_signal()).await
    })?;

    Ok(())
}

fn status(ctx: &RuntimeContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let socket = workspace.paths.socket_path();
    if !rpc::daemon_available(&socket) {
        bail!("no daemon running for this workspace (socket: {})", socket.display());
    }

    let health = rpc::call(&socket, "health", serde_json::json!({}), Duration::from_secs(5))?;
    let bus = rpc::call(&socket, "busStatus", serde_json::json!({}), Duration::from_secs(5))?;

    if ctx.json {
        output_json(&serde_json::json!({"health": health, "bus": bus}));
    } else {
        println!(
            "Daemon: {} (version {})",
            health["status"].as_str().unwrap_or("unknown"),
            health["version"].as_str().unwrap_or("?")
        );
        println!(
            "Bus: {} subscribers, {} events published",
            bus["subscribers"], bus["published"]
        );
    }
    Ok(())
}
