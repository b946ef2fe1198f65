//! ShareLink entity - role-scoped bearer tokens for a build

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

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
pub enum LinkType {
  #[sea_orm(string_value = "qa")]
  Qa,
  #[sea_orm(string_value = "stakeholder")]
  Stakeholder,
  #[sea_orm(string_value = "beta_tester")]
  BetaTester,
  #[sea_orm(string_value = "reviewer")]
  Reviewer,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "share_links")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub build_id: i32,
  #[sea_orm(unique)]
  pub token: String,
  #[sea_orm(unique)]
  pub short_id: String,
  pub link_type: LinkType,
  pub label: Option<String>,
  pub max_uses: Option<i32>,
  pub current_uses: i32,
  pub unique_devices: i32,
  pub last_used_at: Option<DateTime>,
  pub is_active: bool,
  pub created_at: DateTime,
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
  #[sea_orm(has_many = "super::link_device::Entity")]
  Devices,
}

impl Related<super::build::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Build.def()
  }
}

impl Related<super::link_device::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Devices.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
