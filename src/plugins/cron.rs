use std::sync::Arc;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Retires builds behind guest uploads nobody claimed in time.
pub struct GuestSweeper;

#[async_trait]
impl Plugin for GuestSweeper {
  fn name(&self) -> &'static str {
    "guest-sweeper"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut interval = time::interval(app.config.sweep_interval);

    loop {
      interval.tick().await;

      let now = Utc::now().naive_utc();
      match app.sv().guest.sweep(now).await {
        Ok(0) => debug!("Guest sweep: nothing expired"),
        Ok(count) => info!("Guest sweep disabled {count} expired builds"),
        Err(err) => error!("Guest sweep failed: {err}"),
      }
    }
  }
}
