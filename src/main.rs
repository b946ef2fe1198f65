//! Access-policy engine for build distribution.
//!
//! - SeaORM for persistence (SQLite)
//! - Axum for the HTTP API with rate limiting
//! - Tokio plugins for the server and the guest sweeper

mod entity;
mod error;
mod plugins;
mod policy;
mod prelude;
mod state;
mod sv;
mod utils;

use std::sync::Arc;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, cron::GuestSweeper, server},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "appdrop=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting appdrop v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env()?;
  let app = Arc::new(AppState::new(config).await?);

  let plugins = App::new(Duration::from_secs(5))
    .register(server::Plugin)
    .register(GuestSweeper)
    .run(app);

  tokio::signal::ctrl_c().await.context("Failed to listen for shutdown")?;
  info!("Shutting down {} plugins", plugins.len());
  drop(plugins);

  Ok(())
}
