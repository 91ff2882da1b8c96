//! `curate`: operator and cron command line for a curate server.
//!
//! # Usage
//!
//! ```text
//! curate embargo set <OBJECT> --after public --release 2030-05-01
//! curate embargoes list --state expired
//! curate embargoes release            # nightly cron
//! curate authorities merge <OLD> <NEW>
//! ```
//!
//! Every command prints the server's JSON response.

mod client;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use client::{ApiClient, ApiConfig};
use curate_core::{
  lifecycle::{EmbargoParams, ReleaseReport},
  merge::MergeReport,
  policy::{PolicyId, Visibility},
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "curate", about = "Manage embargoes and authorities on a curate server")]
struct Args {
  /// Path to a TOML config file (url, timeout_secs).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the curate server (default: http://localhost:8700).
  #[arg(long, env = "CURATE_URL", global = true)]
  url: Option<String>,

  /// Request timeout in seconds (default: 30).
  #[arg(long, env = "CURATE_TIMEOUT", global = true)]
  timeout: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Act on the embargo of a single object.
  Embargo {
    #[command(subcommand)]
    action: EmbargoAction,
  },
  /// Query or sweep embargoes across the repository.
  Embargoes {
    #[command(subcommand)]
    action: EmbargoesAction,
  },
  /// Maintain local authority records.
  Authorities {
    #[command(subcommand)]
    action: AuthoritiesAction,
  },
}

#[derive(Subcommand, Debug)]
enum EmbargoAction {
  /// Set or replace an object's embargo.
  Set {
    object_id: Uuid,
    /// Visibility once the embargo is lifted.
    #[arg(long)]
    after:     Visibility,
    /// Release date, `YYYY-MM-DD`.
    #[arg(long)]
    release:   NaiveDate,
    /// Visibility while embargoed (default: embargoed).
    #[arg(long)]
    during:    Option<Visibility>,
    /// Admin policy to assign alongside the embargo.
    #[arg(long)]
    policy:    Option<String>,
  },
  /// Remove an object's embargo without touching its visibility.
  Remove { object_id: Uuid },
  /// Lift an object's embargo now.
  Deactivate {
    object_id: Uuid,
    #[arg(long)]
    as_of:     Option<NaiveDate>,
  },
  /// Copy one object's embargo onto another.
  Copy { source: Uuid, destination: Uuid },
}

#[derive(Subcommand, Debug)]
enum EmbargoesAction {
  /// List works by embargo state.
  List {
    #[arg(long, value_enum)]
    state: StateArg,
    /// Evaluate `expired` as of this date instead of today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
  },
  /// Deactivate every expired embargo. Exits non-zero if any failed.
  Release {
    #[arg(long)]
    as_of: Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
enum AuthoritiesAction {
  /// Move every reference from OLD to NEW, then retire OLD. Exits non-zero
  /// if any rewrite or the retire failed.
  Merge { old: Uuid, new: Uuid },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StateArg {
  Expired,
  Active,
  Deactivated,
}

impl StateArg {
  fn as_str(self) -> &'static str {
    match self {
      StateArg::Expired => "expired",
      StateArg::Active => "active",
      StateArg::Deactivated => "deactivated",
    }
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  timeout_secs: Option<u64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8700".to_string()),
    timeout:  Duration::from_secs(args.timeout.or(file_cfg.timeout_secs).unwrap_or(30)),
  };
  tracing::debug!(url = %api_config.base_url, "using curate server");

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Embargo { action } => match action {
      EmbargoAction::Set { object_id, after, release, during, policy } => {
        let params = EmbargoParams {
          policy_id:         policy.map(PolicyId),
          visibility_during: during,
          visibility_after:  after,
          release_date:      release,
        };
        print_json(&client.set_embargo(object_id, &params).await?)
      }
      EmbargoAction::Remove { object_id } => {
        let removed = client.remove_embargo(object_id).await?;
        print_json(&serde_json::json!({ "object_id": object_id, "removed": removed }))
      }
      EmbargoAction::Deactivate { object_id, as_of } => {
        print_json(&client.deactivate_embargo(object_id, as_of).await?)
      }
      EmbargoAction::Copy { source, destination } => {
        print_json(&client.copy_embargo(source, destination).await?)
      }
    },

    Command::Embargoes { action } => match action {
      EmbargoesAction::List { state, as_of } => {
        print_json(&client.list_embargoes(state.as_str(), as_of).await?)
      }
      EmbargoesAction::Release { as_of } => {
        let report = client.release_expired(as_of).await?;
        print_json(&report)?;
        release_outcome(&report)
      }
    },

    Command::Authorities { action } => match action {
      AuthoritiesAction::Merge { old, new } => {
        let report = client.merge_authorities(old, new).await?;
        print_json(&report)?;
        merge_outcome(&report)
      }
    },
  }
}

// ─── Exit status ──────────────────────────────────────────────────────────────

/// Fails when any expired embargo could not be released.
fn release_outcome(report: &ReleaseReport) -> Result<()> {
  for failure in &report.failed {
    tracing::error!(
      object_id = %failure.object_id,
      error = %failure.error,
      "release failed"
    );
  }
  if !report.failed.is_empty() {
    bail!(
      "{} of {} expired embargoes failed to release",
      report.failed.len(),
      report.failed.len() + report.released.len()
    );
  }
  Ok(())
}

/// Fails when the merge left the old authority in place.
fn merge_outcome(report: &MergeReport) -> Result<()> {
  let old = report.old_id;
  for failure in &report.failed {
    tracing::error!(
      object_id = %failure.object_id,
      error = %failure.error,
      "rewrite failed"
    );
  }
  if !report.failed.is_empty() {
    bail!(
      "{} of {} objects failed to rewrite; rerun the merge of {old}",
      report.failed.len(),
      report.failed.len() + report.rewritten.len()
    );
  }
  if let Some(error) = &report.retire_error {
    bail!("references moved but {old} was not deleted: {error}; rerun the merge");
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("serialising output")?;
  println!("{out}");
  Ok(())
}
