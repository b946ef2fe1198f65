//! GuestUpload entity - anonymous uploads waiting to be claimed

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guest_uploads")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub build_id: i32,
  /// Claim bearer token handed to the uploader
  #[sea_orm(unique)]
  pub token: String,
  pub device_id: String,
  pub file_type: String,
  pub app_name: String,
  pub version: String,
  pub file_size: i64,
  pub download_count: i32,
  pub expires_at: DateTime,
  pub claimed_by: Option<String>,
  pub claimed_at: Option<DateTime>,
  pub created_at: DateTime,
}

impl Model {
  pub fn is_expired(&self, now: DateTime) -> bool {
    self.expires_at <= now
  }
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
