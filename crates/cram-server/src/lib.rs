//! HTTP server wiring for Cram: configuration loading, the HTTP study
//! material generator, and the top-level router that mounts [`cram_api`]
//! under `/api`.

pub mod generator;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::{Router, routing::get};
use cram_api::ReviewConfig;
use cram_core::generate::MaterialGenerator;
use cram_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::generator::GeneratorConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` overlaid
/// with `CRAM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub review:     ReviewConfig,
  #[serde(default)]
  pub generator:  GeneratorConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("cram.db") }

impl ServerConfig {
  /// Read `path` (optional) and the `CRAM_` environment. Nested keys use a
  /// double underscore, e.g. `CRAM_REVIEW__WEAK_TOPIC_LIMIT`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::load_with(path, environment())
  }

  fn load_with(path: &Path, env: config::Environment) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// `CRAM_PORT` sets `port`; `CRAM_REVIEW__WEAK_TOPIC_LIMIT` sets
/// `review.weak_topic_limit`.
fn environment() -> config::Environment {
  config::Environment::with_prefix("CRAM")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: the JSON API under `/api` plus a `/healthz` liveness check.
pub fn app<G: MaterialGenerator + 'static>(
  store: Arc<SqliteStore>,
  generator: Arc<G>,
  config: &ServerConfig,
) -> Router {
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", cram_api::api_router(store, generator, config.review))
    .layer(TraceLayer::new_for_http())
}
