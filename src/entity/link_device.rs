//! Fingerprints already seen by a share link

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "link_devices")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub link_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub fingerprint: String,
  pub first_seen_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::share_link::Entity",
    from = "Column::LinkId",
    to = "super::share_link::Column::Id",
    on_delete = "Cascade"
  )]
  ShareLink,
}

impl Related<super::share_link::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ShareLink.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
