pub mod cron;
pub mod server;

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinSet, time::sleep};
use tracing::{error, info, warn};

use crate::state::AppState;

/// Longest pause between two restarts of a failing plugin.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str;

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
  backoff: Duration,
}

impl App {
  pub fn new(backoff: Duration) -> Self {
    Self { plugins: Vec::new(), backoff }
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Runs every plugin under its own supervisor. A plugin that returns or
  /// panics is restarted with a doubling delay, reset once it has stayed
  /// up longer than the delay. Dropping the set stops the supervisors.
  pub fn run(self, app: Arc<AppState>) -> JoinSet<()> {
    let mut set = JoinSet::new();

    for plugin in self.plugins {
      let app = app.clone();
      let base = self.backoff;

      set.spawn(async move {
        let name = plugin.name();
        let mut delay = base;
        info!("Plugin `{name}` started");

        loop {
          let started = tokio::time::Instant::now();
          let task = {
            let (app, plugin) = (app.clone(), plugin.clone());
            tokio::spawn(async move { plugin.start(app).await })
          };

          match task.await {
            Ok(Ok(())) => warn!("Plugin `{name}` returned, restarting"),
            Ok(Err(err)) => error!("Plugin `{name}` failed: {err:#}"),
            Err(err) if err.is_cancelled() => {
              info!("Plugin `{name}` cancelled");
              break;
            }
            Err(_) => error!("Plugin `{name}` panicked"),
          }

          if started.elapsed() > delay {
            delay = base;
          }
          sleep(delay).await;
          delay = (delay * 2).min(MAX_BACKOFF);
        }
      });
    }

    set
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{state::Config, sv::testing::setup_test_db};

  struct Flaky(Arc<AtomicUsize>);

  #[async_trait::async_trait]
  impl Plugin for Flaky {
    fn name(&self) -> &'static str {
      "flaky"
    }

    async fn start(&self, _app: Arc<AppState>) -> anyhow::Result<()> {
      let attempt = self.0.fetch_add(1, Ordering::SeqCst);
      if attempt < 2 {
        anyhow::bail!("attempt {attempt} failed");
      }
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_failing_plugin_is_restarted() {
    let app = Arc::new(AppState::with_db(
      setup_test_db().await,
      Config::default(),
    ));
    let starts = Arc::new(AtomicUsize::new(0));

    let set = App::new(Duration::from_millis(5))
      .register(Flaky(starts.clone()))
      .run(app);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 3);

    drop(set);
  }
}
