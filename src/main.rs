use std::fs::OpenOptions;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod action;
mod cli;
mod entry;
mod error;
mod mirrorer;
mod plan;
mod session;
mod transport;
mod tree;
mod util;

use cli::Direction;
use mirrorer::{Mirrorer, MirrorerConfig};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing_if_requested(cli.debug);
    println!("mirror run started at UTC {}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));

    let config = MirrorerConfig {
        local_base: cli.local_base.clone(),
        host: cli.host.clone(),
        port: cli.port,
        username: cli.username.clone(),
        password: cli.password.clone(),
        private_key: cli.private_key.clone(),
        private_key_pass: cli.private_key_pass.clone(),
        timeout: Duration::from_secs(cli.timeout),
        read_timeout: Duration::from_secs(cli.read_timeout),
        max_attempts: cli.max_attempts,
        verify_host_key: cli.verify_host_key,
    };

    let mut mirrorer = Mirrorer::connect(config)?;

    let mut total_actions: u64 = 0;
    let mut callback = |action: &plan::Action| -> Result<(), error::MirrorError> {
        println!("{}", action.render());
        total_actions += 1;
        Ok(())
    };

    let started = Instant::now();
    let executed = match cli.direction {
        Direction::FromRemote => mirrorer.mirror_from_remote(Some(&mut callback), cli.dry_run),
        Direction::ToRemote => mirrorer.mirror_to_remote(Some(&mut callback), cli.dry_run),
    }?;
    let elapsed = started.elapsed().as_secs_f64();

    let transferred_bytes: u64 = executed
        .actions()
        .iter()
        .filter(|a| matches!(a.code, plan::ActionCode::Get | plan::ActionCode::Put))
        .filter_map(|a| a.remote_entry.as_ref().or(a.local_entry.as_ref()))
        .map(|e| e.size())
        .sum();
    util::print_summary(transferred_bytes, elapsed, total_actions, mirrorer.reconnects());

    mirrorer.close();
    Ok(())
}

fn init_tracing_if_requested(debug: bool) {
    let logs_dir = dirs::home_dir()
        .map(|home| home.join(".durasftp").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from(".durasftp-logs"));
    let _ = std::fs::create_dir_all(&logs_dir);

    let log_path = logs_dir.join("debug.log");
    let level_str = if debug { "debug" } else { "warn" };

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let (non_blocking_writer, guard) = non_blocking(file);
            // Leak the worker guard so the background thread stays alive
            // for the process lifetime; dropping it would stop the writer
            // and lose buffered log lines.
            let _ = Box::leak(Box::new(guard));
            let file_layer = fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level_str));
            tracing_subscriber::registry().with(file_layer).init();
        }
        Err(e) => {
            eprintln!("warning: could not open debug log at {}: {}", log_path.display(), e);
        }
    }
}
