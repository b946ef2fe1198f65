//! Account entity - owners as supplied by the identity provider

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::ExpiryType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub default_expiry_type: ExpiryType,
  pub default_expiry_time_days: Option<i32>,
  pub default_expiry_download_limit: Option<i32>,
  pub default_expiry_device_limit: Option<i32>,
  pub build_count: i32,
  pub claimed_count: i32,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
