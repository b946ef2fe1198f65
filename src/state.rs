use std::env;

use migration::{Migrator, MigratorTrait};

use crate::{policy::Expiry, prelude::*, sv};

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Lifetime of an unclaimed guest upload
  pub guest_ttl: TimeDelta,
  pub sweep_interval: Duration,
  /// Expiry policy handed to newly registered accounts
  pub default_expiry: Expiry,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:appdrop.db?mode=rwc"),
      port: 3000,
      guest_ttl: TimeDelta::hours(24),
      sweep_interval: Duration::from_secs(10 * 60),
      default_expiry: Expiry::None,
    }
  }
}

fn duration(key: &str) -> anyhow::Result<Option<Duration>> {
  match env::var(key) {
    Ok(raw) => humantime::parse_duration(&raw)
      .map(Some)
      .with_context(|| format!("Invalid {key} `{raw}`")),
    Err(_) => Ok(None),
  }
}

/// Parses `DEFAULT_EXPIRY_DAYS` into the policy new accounts start with.
fn default_expiry(raw: &str) -> anyhow::Result<Expiry> {
  let days = raw
    .trim()
    .parse()
    .with_context(|| format!("Invalid DEFAULT_EXPIRY_DAYS `{raw}`"))?;
  let expiry = Expiry::Time { expiry_time_days: days };

  let now = Utc::now().naive_utc();
  expiry
    .resolve(now, now)
    .with_context(|| format!("Invalid DEFAULT_EXPIRY_DAYS `{raw}`"))?;

  Ok(expiry)
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let mut config = Self::default();

    if let Ok(url) = env::var("DATABASE_URL") {
      config.database_url = url;
    }

    if let Ok(port) = env::var("PORT") {
      config.port =
        port.parse().with_context(|| format!("Invalid PORT `{port}`"))?;
    }

    if let Some(ttl) = duration("GUEST_TTL")? {
      config.guest_ttl =
        TimeDelta::from_std(ttl).context("GUEST_TTL out of range")?;
    }

    if let Some(interval) = duration("SWEEP_INTERVAL")? {
      config.sweep_interval = interval;
    }

    if let Ok(days) = env::var("DEFAULT_EXPIRY_DAYS") {
      config.default_expiry = default_expiry(&days)?;
    }

    Ok(config)
  }
}

pub struct Services<'a> {
  pub account: sv::Account<'a>,
  pub build: sv::Build<'a>,
  pub share: sv::Share<'a>,
  pub guest: sv::Guest<'a>,
  pub analytics: sv::Analytics<'a>,
  pub download: sv::Download<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    Ok(Self::with_db(db, config))
  }

  pub fn with_db(db: DatabaseConnection, config: Config) -> Self {
    Self { db, config }
  }

  pub fn sv(&self) -> Services<'_> {
    let defaults = self.config.default_expiry;

    Services {
      account: sv::Account::new(&self.db, defaults),
      build: sv::Build::new(&self.db, defaults),
      share: sv::Share::new(&self.db),
      guest: sv::Guest::new(&self.db, defaults, self.config.guest_ttl),
      analytics: sv::Analytics::new(&self.db),
      download: sv::Download::new(&self.db),
    }
  }
}
