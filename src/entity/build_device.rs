//! Fingerprints already counted for a build

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "build_devices")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub build_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub fingerprint: String,
  pub first_seen_at: DateTime,
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
