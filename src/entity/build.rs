//! Build entity - an uploaded binary and its distribution policy

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Hash,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
  #[sea_orm(string_value = "ios")]
  Ios,
  #[sea_orm(string_value = "android")]
  Android,
}

#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ExpiryType {
  #[default]
  #[sea_orm(string_value = "none")]
  None,
  #[sea_orm(string_value = "time")]
  Time,
  #[sea_orm(string_value = "downloads")]
  Downloads,
  #[sea_orm(string_value = "devices")]
  Devices,
  #[sea_orm(string_value = "combined")]
  Combined,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "builds")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Absent while the build is an unclaimed guest upload
  pub owner: Option<String>,
  pub platform: Platform,
  pub app_name: String,
  pub version: String,
  pub build_number: String,
  pub file_size: i64,
  pub bundle_id: String,
  pub created_at: DateTime,
  pub updated_at: DateTime,
  pub is_enabled: bool,
  pub is_latest: bool,
  pub is_deprecated: bool,
  pub expiry_type: ExpiryType,
  pub expires_at: Option<DateTime>,
  pub expiry_time_days: Option<i32>,
  pub expiry_download_limit: Option<i32>,
  pub expiry_device_limit: Option<i32>,
  pub download_count: i32,
  pub unique_devices_count: i32,
  pub install_success_count: i32,
  /// Opaque to the engine
  pub branding: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::share_link::Entity")]
  ShareLinks,
  #[sea_orm(has_many = "super::analytics::Entity")]
  Analytics,
  #[sea_orm(has_one = "super::guest_upload::Entity")]
  GuestUpload,
}

impl Related<super::share_link::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ShareLinks.def()
  }
}

impl Related<super::analytics::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Analytics.def()
  }
}

impl Related<super::guest_upload::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::GuestUpload.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
