//! Download attempts: resolve, evaluate, then record.
//!
//! An attempt runs in one transaction. The install record is inserted
//! first, keyed by its `event_id`, so a redelivery of the same event
//! either loses that insert and is answered as a replay, or waits for the
//! first delivery to finish. Only a freshly inserted record consumes a
//! share link use; an exhausted link rolls the record back.
//!
//! Build limits are evaluated against the counters visible when the
//! attempt starts. Share link `max_uses` is the hard boundary: it is
//! re-checked atomically while recording and the losing racer receives
//! `Conflict::Exhausted`.

use serde::{Deserialize, Serialize};

use crate::{
  entity::{InstallStatus, analytics, build, share_link},
  policy::{self, Decision},
  prelude::*,
  sv::{
    self,
    analytics::{DeviceMeta, InstallEvent},
    share,
  },
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct InstallRequest {
  /// Delivery id for replay protection, generated when absent
  #[serde(default)]
  pub event_id: Option<String>,
  pub device: DeviceMeta,
  pub install_status: InstallStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Attempt {
  Granted {
    record: analytics::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<share_link::Model>,
  },
  Denied {
    decision: Decision,
  },
}

pub struct Download<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Download<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn via_link(
    &self,
    key: &str,
    request: InstallRequest,
    now: DateTime,
  ) -> Result<Attempt> {
    let link = sv::Share::new(self.db).resolve(key).await?;
    self.build(link.build_id).await?;
    self.attempt(link.build_id, Some(link), request, now).await
  }

  pub async fn direct(
    &self,
    build_id: i32,
    request: InstallRequest,
    now: DateTime,
  ) -> Result<Attempt> {
    self.build(build_id).await?;
    self.attempt(build_id, None, request, now).await
  }

  async fn build(&self, id: i32) -> Result<build::Model> {
    build::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::BuildNotFound)
  }

  async fn attempt(
    &self,
    build_id: i32,
    link: Option<share_link::Model>,
    request: InstallRequest,
    now: DateTime,
  ) -> Result<Attempt> {
    let link_id = link.as_ref().map(|link| link.id);
    let event = InstallEvent {
      event_id: request.event_id.unwrap_or_else(utils::event_id),
      build_id,
      share_link_id: link_id,
      device: request.device,
      install_status: request.install_status,
    };
    sv::analytics::validate(&event)?;

    let event_id = event.event_id.clone();
    let txn = self.db.begin().await?;

    let Some(record) = sv::analytics::insert_record(&txn, event, now).await?
    else {
      let record = sv::analytics::find_event(&txn, &event_id)
        .await?
        .ok_or_else(|| Error::Internal("install record vanished".into()))?;

      if record.build_id != build_id || record.share_link_id != link_id {
        warn!("Event `{event_id}` replayed against another download");
        return Err(Error::validation(format!(
          "event_id `{event_id}` belongs to another download"
        )));
      }

      debug!("Download attempt `{event_id}` already recorded");
      return Ok(Attempt::Granted { record, link });
    };

    let build = build::Entity::find_by_id(build_id)
      .one(&txn)
      .await?
      .ok_or(Error::BuildNotFound)?;

    // dropping the transaction discards the record of a denied attempt
    let decision = policy::evaluate(&build.snapshot()?, now);
    if !decision.allowed {
      debug!("Build {build_id} denied: {:?}", decision.reason);
      return Ok(Attempt::Denied { decision });
    }

    let link = match link_id {
      Some(id) => {
        Some(share::consume(&txn, id, &record.device_fingerprint, now).await?)
      }
      None => None,
    };

    sv::analytics::count_install(&txn, &record, now).await?;
    txn.commit().await?;

    if let Some(link) = &link
      && !link.is_active
    {
      info!("Share link {} exhausted after {} uses", link.id, link.current_uses);
    }

    Ok(Attempt::Granted { record, link })
  }
}
