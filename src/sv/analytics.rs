use std::collections::HashSet;

use sea_orm::{
  ActiveEnum,
  sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{
    InstallStatus, Platform, analytics, build, build_device, guest_upload,
  },
  prelude::*,
  utils,
};

/// Number of entries kept in [`Rollup::top_devices`].
const TOP_DEVICES: usize = 5;

/// Device metadata as reported by the installing client. The fingerprint
/// is unauthenticated and only used to deduplicate counts.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceMeta {
  pub fingerprint: String,
  pub device_type: String,
  #[serde(default)]
  pub device_model: Option<String>,
  pub platform: Platform,
  #[serde(default)]
  pub country: Option<String>,
  #[serde(default)]
  pub city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InstallEvent {
  pub event_id: String,
  pub build_id: i32,
  pub share_link_id: Option<i32>,
  pub device: DeviceMeta,
  pub install_status: InstallStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCount {
  pub device_model: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
  pub total_downloads: u64,
  pub unique_devices: u64,
  pub success_rate: f64,
  pub device_type_breakdown: BTreeMap<String, u64>,
  pub platform_breakdown: BTreeMap<String, u64>,
  pub geo_distribution: BTreeMap<String, u64>,
  pub top_devices: Vec<DeviceCount>,
}

impl Rollup {
  pub fn from_records(records: &[analytics::Model]) -> Self {
    let mut devices = HashSet::new();
    let mut successes = 0u64;
    let mut device_types = BTreeMap::new();
    let mut platforms = BTreeMap::new();
    let mut geo = BTreeMap::new();
    let mut models = BTreeMap::<String, u64>::new();

    for record in records {
      devices.insert(record.device_fingerprint.as_str());
      if record.install_status == InstallStatus::Success {
        successes += 1;
      }

      *device_types.entry(record.device_type.clone()).or_insert(0) += 1;
      *platforms.entry(record.platform.to_value()).or_insert(0) += 1;

      let place = match (&record.country, &record.city) {
        (Some(country), Some(city)) => format!("{country}/{city}"),
        (Some(country), None) => country.clone(),
        _ => "unknown".to_string(),
      };
      *geo.entry(place).or_insert(0) += 1;

      if let Some(model) = &record.device_model {
        *models.entry(model.clone()).or_insert(0) += 1;
      }
    }

    let total = records.len() as u64;
    let success_rate =
      if total == 0 { 0.0 } else { successes as f64 / total as f64 };

    let mut top_devices: Vec<_> = models
      .into_iter()
      .map(|(device_model, count)| DeviceCount { device_model, count })
      .collect();
    // stable sort keeps the alphabetical order for equal counts
    top_devices.sort_by(|a, b| b.count.cmp(&a.count));
    top_devices.truncate(TOP_DEVICES);

    Self {
      total_downloads: total,
      unique_devices: devices.len() as u64,
      success_rate,
      device_type_breakdown: device_types,
      platform_breakdown: platforms,
      geo_distribution: geo,
      top_devices,
    }
  }
}

pub struct Analytics<'a> {
  db: &'a DatabaseConnection,
}

/// Rejects events that cannot be recorded, before anything is written.
pub(crate) fn validate(event: &InstallEvent) -> Result<()> {
  utils::required(&event.event_id, "event_id")?;
  utils::required(&event.device.fingerprint, "device_fingerprint")?;
  utils::required(&event.device.device_type, "device_type")
}

pub(crate) async fn find_event<C: ConnectionTrait>(
  db: &C,
  event_id: &str,
) -> Result<Option<analytics::Model>> {
  let record = analytics::Entity::find()
    .filter(analytics::Column::EventId.eq(event_id))
    .one(db)
    .await?;
  Ok(record)
}

/// Appends the record unless its `event_id` is already stored.
/// Returns `None` for a replay.
pub(crate) async fn insert_record<C: ConnectionTrait>(
  db: &C,
  event: InstallEvent,
  now: DateTime,
) -> Result<Option<analytics::Model>> {
  let event_id = event.event_id.clone();

  let inserted = analytics::Entity::insert(analytics::ActiveModel {
    id: NotSet,
    event_id: Set(event.event_id),
    build_id: Set(event.build_id),
    share_link_id: Set(event.share_link_id),
    device_fingerprint: Set(event.device.fingerprint),
    device_type: Set(event.device.device_type),
    device_model: Set(event.device.device_model),
    platform: Set(event.device.platform),
    country: Set(event.device.country),
    city: Set(event.device.city),
    install_status: Set(event.install_status),
    installed_at: Set(now),
  })
  .on_conflict(
    OnConflict::column(analytics::Column::EventId).do_nothing().to_owned(),
  )
  .exec_without_returning(db)
  .await?;

  if inserted == 0 {
    return Ok(None);
  }

  find_event(db, &event_id)
    .await?
    .map(Some)
    .ok_or_else(|| Error::Internal("install record vanished".into()))
}

/// Bumps the build and guest upload counters for a freshly stored record.
pub(crate) async fn count_install<C: ConnectionTrait>(
  db: &C,
  record: &analytics::Model,
  now: DateTime,
) -> Result<()> {
  use build::Column;

  let build_id = record.build_id;

  let mut counters = build::Entity::update_many()
    .col_expr(Column::DownloadCount, Expr::col(Column::DownloadCount).add(1));
  if record.install_status == InstallStatus::Success {
    counters = counters.col_expr(
      Column::InstallSuccessCount,
      Expr::col(Column::InstallSuccessCount).add(1),
    );
  }
  counters.filter(Column::Id.eq(build_id)).exec(db).await?;

  let new_device = build_device::Entity::insert(build_device::ActiveModel {
    build_id: Set(build_id),
    fingerprint: Set(record.device_fingerprint.clone()),
    first_seen_at: Set(now),
  })
  .on_conflict(
    OnConflict::columns([
      build_device::Column::BuildId,
      build_device::Column::Fingerprint,
    ])
    .do_nothing()
    .to_owned(),
  )
  .exec_without_returning(db)
  .await?;

  if new_device > 0 {
    build::Entity::update_many()
      .col_expr(
        Column::UniqueDevicesCount,
        Expr::col(Column::UniqueDevicesCount).add(1),
      )
      .filter(Column::Id.eq(build_id))
      .exec(db)
      .await?;
  }

  guest_upload::Entity::update_many()
    .col_expr(
      guest_upload::Column::DownloadCount,
      Expr::col(guest_upload::Column::DownloadCount).add(1),
    )
    .filter(guest_upload::Column::BuildId.eq(build_id))
    .exec(db)
    .await?;

  Ok(())
}

impl<'a> Analytics<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_event(
    &self,
    event_id: &str,
  ) -> Result<Option<analytics::Model>> {
    find_event(self.db, event_id).await
  }

  /// Appends an install event and bumps the build counters.
  ///
  /// Replaying an already recorded `event_id` returns the stored record
  /// and leaves every counter untouched.
  pub async fn record_install(
    &self,
    event: InstallEvent,
    now: DateTime,
  ) -> Result<analytics::Model> {
    validate(&event)?;

    let event_id = event.event_id.clone();
    let txn = self.db.begin().await?;

    build::Entity::find_by_id(event.build_id)
      .one(&txn)
      .await?
      .ok_or(Error::BuildNotFound)?;

    let Some(record) = insert_record(&txn, event, now).await? else {
      debug!("Install event `{event_id}` replayed, ignoring");
      return find_event(&txn, &event_id)
        .await?
        .ok_or_else(|| Error::Internal("install record vanished".into()));
    };

    count_install(&txn, &record, now).await?;
    txn.commit().await?;

    debug!(
      "Install {:?} recorded for build {}",
      record.install_status, record.build_id
    );
    Ok(record)
  }

  pub async fn records(&self, build_id: i32) -> Result<Vec<analytics::Model>> {
    let records = analytics::Entity::find()
      .filter(analytics::Column::BuildId.eq(build_id))
      .order_by_asc(analytics::Column::Id)
      .all(self.db)
      .await?;
    Ok(records)
  }

  pub async fn rollup(&self, build_id: i32) -> Result<Rollup> {
    Ok(Rollup::from_records(&self.records(build_id).await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    policy::{Expiry, Reason},
    sv::{
      self,
      testing::{device, new_build, setup_test_db, t0},
    },
  };

  fn event(
    build_id: i32,
    fingerprint: &str,
    status: InstallStatus,
  ) -> InstallEvent {
    InstallEvent {
      event_id: utils::event_id(),
      build_id,
      share_link_id: None,
      device: device(fingerprint),
      install_status: status,
    }
  }

  #[tokio::test]
  async fn test_counters_and_device_dedup() {
    let db = setup_test_db().await;
    let builds = sv::Build::new(&db, Expiry::None);
    let sv = Analytics::new(&db);

    let build =
      builds.create("acc-1", new_build("com.a", None), t0()).await.unwrap();

    sv.record_install(event(build.id, "dev-a", InstallStatus::Success), t0())
      .await
      .unwrap();
    assert_eq!(builds.get(build.id).await.unwrap().unique_devices_count, 1);

    for status in [InstallStatus::Failure, InstallStatus::Success] {
      sv.record_install(event(build.id, "dev-a", status), t0()).await.unwrap();
      assert_eq!(builds.get(build.id).await.unwrap().unique_devices_count, 1);
    }

    let build = builds.get(build.id).await.unwrap();
    assert_eq!(build.download_count, 3);
    assert_eq!(build.install_success_count, 2);
  }

  #[tokio::test]
  async fn test_replay_is_ignored() {
    let db = setup_test_db().await;
    let builds = sv::Build::new(&db, Expiry::None);
    let sv = Analytics::new(&db);

    let build =
      builds.create("acc-1", new_build("com.a", None), t0()).await.unwrap();

    let install = event(build.id, "dev-a", InstallStatus::Success);
    let first = sv.record_install(install.clone(), t0()).await.unwrap();
    let again = sv.record_install(install, t0()).await.unwrap();

    assert_eq!(first, again);

    let build = builds.get(build.id).await.unwrap();
    assert_eq!(build.download_count, 1);
    assert_eq!(build.install_success_count, 1);

    let rollup = sv.rollup(build.id).await.unwrap();
    assert_eq!(rollup.total_downloads, 1);
  }

  #[tokio::test]
  async fn test_unknown_build() {
    let db = setup_test_db().await;
    let result = Analytics::new(&db)
      .record_install(event(31337, "dev-a", InstallStatus::Success), t0())
      .await;
    assert!(matches!(result, Err(Error::BuildNotFound)));
  }

  #[tokio::test]
  async fn test_download_limit_scenario() {
    let db = setup_test_db().await;
    let builds = sv::Build::new(&db, Expiry::None);
    let sv = Analytics::new(&db);

    let build = builds
      .create(
        "acc-1",
        new_build("com.a", Some(Expiry::Downloads { expiry_download_limit: 2 })),
        t0(),
      )
      .await
      .unwrap();

    for fp in ["dev-a", "dev-b"] {
      sv.record_install(event(build.id, fp, InstallStatus::Success), t0())
        .await
        .unwrap();
    }

    assert_eq!(builds.get(build.id).await.unwrap().download_count, 2);

    let decision = builds.evaluate(build.id, t0()).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Reason::DownloadLimitReached);
  }

  #[tokio::test]
  async fn test_rollup() {
    let db = setup_test_db().await;
    let builds = sv::Build::new(&db, Expiry::None);
    let sv = Analytics::new(&db);

    let build =
      builds.create("acc-1", new_build("com.a", None), t0()).await.unwrap();

    let mut android = event(build.id, "dev-b", InstallStatus::Failure);
    android.device.platform = Platform::Android;
    android.device.device_type = "tablet".into();
    android.device.device_model = Some("Pixel Tablet".into());
    android.device.country = Some("DE".into());
    android.device.city = Some("Berlin".into());

    let mut unknown = event(build.id, "dev-c", InstallStatus::Pending);
    unknown.device.country = None;
    unknown.device.device_model = None;

    for install in [
      event(build.id, "dev-a", InstallStatus::Success),
      event(build.id, "dev-a", InstallStatus::Success),
      android,
      unknown,
    ] {
      sv.record_install(install, t0()).await.unwrap();
    }

    let rollup = sv.rollup(build.id).await.unwrap();

    assert_eq!(rollup.total_downloads, 4);
    assert_eq!(rollup.unique_devices, 3);
    assert!((rollup.success_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(rollup.device_type_breakdown["phone"], 3);
    assert_eq!(rollup.device_type_breakdown["tablet"], 1);
    assert_eq!(rollup.platform_breakdown["ios"], 3);
    assert_eq!(rollup.platform_breakdown["android"], 1);
    assert_eq!(rollup.geo_distribution["NL"], 2);
    assert_eq!(rollup.geo_distribution["DE/Berlin"], 1);
    assert_eq!(rollup.geo_distribution["unknown"], 1);
    assert_eq!(
      rollup.top_devices,
      vec![
        DeviceCount { device_model: "iPhone15,2".into(), count: 2 },
        DeviceCount { device_model: "Pixel Tablet".into(), count: 1 },
      ]
    );
  }

  #[test]
  fn test_empty_rollup() {
    let rollup = Rollup::from_records(&[]);
    assert_eq!(rollup.total_downloads, 0);
    assert_eq!(rollup.success_rate, 0.0);
    assert!(rollup.top_devices.is_empty());
  }
}
