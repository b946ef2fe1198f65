pub mod account;
pub mod analytics;
pub mod build;
pub mod download;
pub mod guest;
pub mod share;

pub use account::Account;
pub use analytics::Analytics;
pub use build::Build;
pub use download::Download;
pub use guest::Guest;
pub use share::Share;

#[cfg(test)]
pub(crate) mod testing {
  use chrono::NaiveDate;
  use migration::{Migrator, MigratorTrait};
  use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbBackend, Schema};
  use tempfile::TempDir;

  use crate::{
    entity::*,
    policy::Expiry,
    prelude::*,
    sv::{analytics::DeviceMeta, build::NewBuild},
  };

  pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();

    let tables = [
      schema.create_table_from_entity(account::Entity),
      schema.create_table_from_entity(build::Entity),
      schema.create_table_from_entity(share_link::Entity),
      schema.create_table_from_entity(link_device::Entity),
      schema.create_table_from_entity(build_device::Entity),
      schema.create_table_from_entity(guest_upload::Entity),
      schema.create_table_from_entity(analytics::Entity),
    ];

    for stmt in tables {
      db.execute(backend.build(&stmt)).await.unwrap();
    }

    db
  }

  /// Migrated database file behind a pool of several connections, so
  /// concurrent callers really race at the storage layer.
  pub async fn file_db() -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appdrop.db");

    let mut options =
      ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(8).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (dir, db)
  }

  pub fn new_build(bundle_id: &str, expiry: Option<Expiry>) -> NewBuild {
    NewBuild {
      platform: Platform::Ios,
      app_name: "Sample".into(),
      version: "1.0.0".into(),
      build_number: "42".into(),
      file_size: 1024,
      bundle_id: bundle_id.into(),
      expiry,
      branding: None,
    }
  }

  pub fn device(fingerprint: &str) -> DeviceMeta {
    DeviceMeta {
      fingerprint: fingerprint.into(),
      device_type: "phone".into(),
      device_model: Some("iPhone15,2".into()),
      platform: Platform::Ios,
      country: Some("NL".into()),
      city: None,
    }
  }

  pub fn t0() -> DateTime {
    NaiveDate::from_ymd_opt(2026, 5, 4)
      .and_then(|d| d.and_hms_opt(9, 30, 0))
      .unwrap()
  }
}
