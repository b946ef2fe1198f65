//! Append-only install/download events

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::Platform;

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
  #[sea_orm(string_value = "success")]
  Success,
  #[sea_orm(string_value = "failure")]
  Failure,
  #[sea_orm(string_value = "pending")]
  Pending,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analytics_records")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Delivery id, replays of the same event are ignored
  #[sea_orm(unique)]
  pub event_id: String,
  pub build_id: i32,
  pub share_link_id: Option<i32>,
  pub device_fingerprint: String,
  pub device_type: String,
  pub device_model: Option<String>,
  pub platform: Platform,
  pub country: Option<String>,
  pub city: Option<String>,
  pub install_status: InstallStatus,
  pub installed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::build::Entity",
    from = "Column::BuildId",
    to = "super::build::Column::Id",
    on_delete = "Cascade"
  )]
  Build,
}

impl Related<super::build::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Build.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
