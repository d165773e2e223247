//! Command-line surface (spec §6.1). A thin `clap` derive layer over
//! [`crate::mirrorer::Mirrorer`] — parsing only, no engine logic lives
//! here, matching the teacher's separation between `cli.rs` and `main.rs`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Durable bidirectional SFTP mirror", long_about = None)]
pub struct Cli {
    /// Local directory to mirror against.
    #[clap(long)]
    pub local_base: PathBuf,

    /// Remote SSH/SFTP host.
    #[clap(long)]
    pub host: String,

    /// SSH username.
    #[clap(long)]
    pub username: String,

    /// SSH/SFTP port.
    #[clap(long, default_value_t = 22)]
    pub port: u16,

    /// Connect timeout in seconds.
    #[clap(long, default_value_t = 5)]
    pub timeout: u64,

    /// Per-socket read timeout in seconds, used by every SFTP primitive
    /// once connected. Distinct from `--timeout`: this is the bound on a
    /// stalled read turning into a retriable fault (spec §4.2).
    #[clap(long, default_value_t = 15)]
    pub read_timeout: u64,

    /// Password authentication. Mutually usable alongside `--private-key`;
    /// both are tried in order if both are supplied (spec §6: "password,
    /// public-key with optional passphrase, or both tried in order").
    #[clap(long)]
    pub password: Option<String>,

    /// Private key file for public-key authentication.
    #[clap(long)]
    pub private_key: Option<PathBuf>,

    /// Passphrase protecting `--private-key`.
    #[clap(long)]
    pub private_key_pass: Option<String>,

    /// Plan the mirror without touching either filesystem.
    #[clap(long, default_value_t = false)]
    pub dry_run: bool,

    /// Number of attempts the durable session makes per primitive before
    /// giving up (spec §4.2's `maxAttempts`).
    #[clap(long, default_value_t = 3)]
    pub max_attempts: usize,

    /// Which side is the source of truth for this run.
    #[clap(long, value_enum, default_value_t = Direction::FromRemote)]
    pub direction: Direction,

    /// Verbose (debug-level) tracing to the log file.
    #[clap(long, default_value_t = false)]
    pub debug: bool,

    /// Verify the server's host key against `~/.ssh/known_hosts`. Pass
    /// `--verify-host-key=no` only to reproduce the original tool's
    /// permissive behaviour (spec §9's "known weakness").
    #[clap(long, default_value_t = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub verify_host_key: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Direction {
    FromRemote,
    ToRemote,
}
