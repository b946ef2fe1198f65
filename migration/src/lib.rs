pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_accounts;
mod m20260901_000002_create_builds;
mod m20260901_000003_create_share_links;
mod m20260901_000004_create_link_devices;
mod m20260901_000005_create_build_devices;
mod m20260901_000006_create_guest_uploads;
mod m20260901_000007_create_analytics_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260901_000001_create_accounts::Migration),
      Box::new(m20260901_000002_create_builds::Migration),
      Box::new(m20260901_000003_create_share_links::Migration),
      Box::new(m20260901_000004_create_link_devices::Migration),
      Box::new(m20260901_000005_create_build_devices::Migration),
      Box::new(m20260901_000006_create_guest_uploads::Migration),
      Box::new(m20260901_000007_create_analytics_records::Migration),
    ]
  }
}
