//! curate server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `CURATE_*` environment variables, opens an in-process SQLite store, and
//! serves the JSON API under `/api`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use curate_core::merge::{MergeOptions, RetirePolicy};
use curate_store_sqlite::{DEFAULT_AUTHORITY_BASE, SqliteStore};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Curate repository server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:              String,
  #[serde(default = "default_port")]
  port:              u16,
  #[serde(default = "default_store_path")]
  store_path:        PathBuf,
  /// Base URI of local authority records as they appear in term values.
  #[serde(default = "default_authority_base")]
  authority_base:    String,
  /// Retire the old authority of a merge even if some objects failed to save.
  #[serde(default)]
  retire_on_failure: bool,
  /// Don't append a merged authority to a field that already cites it.
  #[serde(default)]
  dedupe_merged:     bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8700 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/curate/curate.db") }
fn default_authority_base() -> String { DEFAULT_AUTHORITY_BASE.to_owned() }

impl ServerConfig {
  fn merge_options(&self) -> MergeOptions {
    MergeOptions {
      retire: if self.retire_on_failure {
        RetirePolicy::Always
      } else {
        RetirePolicy::WhenClean
      },
      dedupe: self.dedupe_merged,
      ..MergeOptions::new(self.authority_base.clone())
    }
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CURATE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_authority_base(server_cfg.authority_base.clone());

  let app = Router::new()
    .nest(
      "/api",
      curate_api::api_router(Arc::new(store), server_cfg.merge_options()),
    )
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(
    store = %store_path.display(),
    authority_base = %server_cfg.authority_base,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
