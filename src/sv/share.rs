use sea_orm::{
  ActiveEnum,
  sea_query::{Expr, OnConflict},
};
use serde::Deserialize;

use crate::{
  entity::{LinkType, link_device, share_link},
  prelude::*,
  sv::build::owned,
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewLink {
  pub link_type: String,
  #[serde(default)]
  pub label: Option<String>,
  #[serde(default)]
  pub max_uses: Option<i32>,
}

pub struct Share<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Share<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    principal: &str,
    build_id: i32,
    link: NewLink,
    now: DateTime,
  ) -> Result<share_link::Model> {
    let link_type = LinkType::try_from_value(&link.link_type).map_err(|_| {
      Error::validation(format!("unknown link_type `{}`", link.link_type))
    })?;

    if let Some(max) = link.max_uses
      && max < 1
    {
      return Err(Error::validation("max_uses must be at least 1"));
    }

    owned(self.db, principal, build_id).await?;

    let link = share_link::ActiveModel {
      id: NotSet,
      build_id: Set(build_id),
      token: Set(utils::token()),
      short_id: Set(utils::short_id()),
      link_type: Set(link_type),
      label: Set(link.label),
      max_uses: Set(link.max_uses),
      current_uses: Set(0),
      unique_devices: Set(0),
      last_used_at: Set(None),
      is_active: Set(true),
      created_at: Set(now),
    }
    .insert(self.db)
    .await?;

    info!(
      "Share link {} ({:?}) issued for build {build_id}",
      link.short_id, link.link_type
    );
    Ok(link)
  }

  pub async fn by_build(
    &self,
    principal: &str,
    build_id: i32,
  ) -> Result<Vec<share_link::Model>> {
    owned(self.db, principal, build_id).await?;

    let links = share_link::Entity::find()
      .filter(share_link::Column::BuildId.eq(build_id))
      .order_by_desc(share_link::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(links)
  }

  /// Looks a link up by its bearer token or its short alias.
  pub async fn resolve(&self, key: &str) -> Result<share_link::Model> {
    share_link::Entity::find()
      .filter(
        Condition::any()
          .add(share_link::Column::Token.eq(key))
          .add(share_link::Column::ShortId.eq(key)),
      )
      .one(self.db)
      .await?
      .ok_or(Error::LinkNotFound)
  }

  /// Consumes one use of the link in its own transaction.
  pub async fn record_use(
    &self,
    link_id: i32,
    fingerprint: &str,
    now: DateTime,
  ) -> Result<share_link::Model> {
    utils::required(fingerprint, "device_fingerprint")?;

    let txn = self.db.begin().await?;
    let link = consume(&txn, link_id, fingerprint, now).await?;
    txn.commit().await?;

    if !link.is_active {
      info!("Share link {} exhausted after {} uses", link.id, link.current_uses);
    }
    Ok(link)
  }
}

/// Consumes one use of the link.
///
/// The increment is conditional on the link still being active and under
/// `max_uses`, so concurrent callers can never push `current_uses` past the
/// limit. The use that reaches the limit also deactivates the link.
pub(crate) async fn consume<C: ConnectionTrait>(
  db: &C,
  link_id: i32,
  fingerprint: &str,
  now: DateTime,
) -> Result<share_link::Model> {
  use share_link::Column;

  let consumed = share_link::Entity::update_many()
    .col_expr(Column::CurrentUses, Expr::col(Column::CurrentUses).add(1))
    .col_expr(Column::LastUsedAt, Expr::value(now))
    .filter(Column::Id.eq(link_id))
    .filter(Column::IsActive.eq(true))
    .filter(
      Condition::any()
        .add(Column::MaxUses.is_null())
        .add(Expr::col(Column::CurrentUses).lt(Expr::col(Column::MaxUses))),
    )
    .exec(db)
    .await?;

  if consumed.rows_affected == 0 {
    let exists = share_link::Entity::find_by_id(link_id).one(db).await?;
    return Err(match exists {
      Some(_) => {
        warn!("Share link {link_id} rejected a use: exhausted");
        Conflict::Exhausted.into()
      }
      None => Error::LinkNotFound,
    });
  }

  share_link::Entity::update_many()
    .col_expr(Column::IsActive, Expr::value(false))
    .filter(Column::Id.eq(link_id))
    .filter(Column::MaxUses.is_not_null())
    .filter(Expr::col(Column::CurrentUses).gte(Expr::col(Column::MaxUses)))
    .exec(db)
    .await?;

  let seen = link_device::Entity::insert(link_device::ActiveModel {
    link_id: Set(link_id),
    fingerprint: Set(fingerprint.to_string()),
    first_seen_at: Set(now),
  })
  .on_conflict(
    OnConflict::columns([
      link_device::Column::LinkId,
      link_device::Column::Fingerprint,
    ])
    .do_nothing()
    .to_owned(),
  )
  .exec_without_returning(db)
  .await?;

  if seen > 0 {
    share_link::Entity::update_many()
      .col_expr(Column::UniqueDevices, Expr::col(Column::UniqueDevices).add(1))
      .filter(Column::Id.eq(link_id))
      .exec(db)
      .await?;
  }

  share_link::Entity::find_by_id(link_id)
    .one(db)
    .await?
    .ok_or(Error::LinkNotFound)
}

#[cfg(test)]
mod tests {
  use futures::future;
  use tokio_test::{assert_err, assert_ok};

  use super::*;
  use crate::{
    entity::build,
    policy::Expiry,
    sv::{
      self,
      testing::{file_db, new_build, setup_test_db, t0},
    },
  };

  async fn seed(db: &DatabaseConnection) -> build::Model {
    sv::Build::new(db, Expiry::None)
      .create("acc-1", new_build("com.a", None), t0())
      .await
      .unwrap()
  }

  async fn setup() -> (DatabaseConnection, build::Model) {
    let db = setup_test_db().await;
    let build = seed(&db).await;
    (db, build)
  }

  fn new_link(max_uses: Option<i32>) -> NewLink {
    NewLink { link_type: "beta_tester".into(), label: None, max_uses }
  }

  #[tokio::test]
  async fn test_create_link() {
    let (db, build) = setup().await;
    let sv = Share::new(&db);

    let link = sv
      .create("acc-1", build.id, new_link(Some(3)), t0())
      .await
      .unwrap();

    assert_eq!(link.link_type, LinkType::BetaTester);
    assert_eq!(link.current_uses, 0);
    assert!(link.is_active);
    assert_ne!(link.token, link.short_id);
  }

  #[tokio::test]
  async fn test_create_validates_and_checks_owner() {
    let (db, build) = setup().await;
    let sv = Share::new(&db);

    let bad_type = NewLink { link_type: "admin".into(), ..new_link(None) };
    assert!(matches!(
      sv.create("acc-1", build.id, bad_type, t0()).await,
      Err(Error::Validation(_))
    ));

    assert!(matches!(
      sv.create("acc-1", build.id, new_link(Some(0)), t0()).await,
      Err(Error::Validation(_))
    ));

    assert!(matches!(
      sv.create("acc-2", build.id, new_link(None), t0()).await,
      Err(Error::Forbidden)
    ));

    assert!(matches!(
      sv.create("acc-1", 777, new_link(None), t0()).await,
      Err(Error::BuildNotFound)
    ));
  }

  #[tokio::test]
  async fn test_resolve_by_token_or_short_id() {
    let (db, build) = setup().await;
    let sv = Share::new(&db);

    let link = sv.create("acc-1", build.id, new_link(None), t0()).await.unwrap();

    assert_eq!(sv.resolve(&link.token).await.unwrap().id, link.id);
    assert_eq!(sv.resolve(&link.short_id).await.unwrap().id, link.id);
    assert!(matches!(sv.resolve("nope").await, Err(Error::LinkNotFound)));
  }

  #[tokio::test]
  async fn test_exhaustion_deactivates() {
    let (db, build) = setup().await;
    let sv = Share::new(&db);

    let link =
      sv.create("acc-1", build.id, new_link(Some(2)), t0()).await.unwrap();

    let first = assert_ok!(sv.record_use(link.id, "dev-a", t0()).await);
    assert!(first.is_active);

    let second = assert_ok!(sv.record_use(link.id, "dev-b", t0()).await);
    assert_eq!(second.current_uses, 2);
    assert!(!second.is_active);
    assert_eq!(second.last_used_at, Some(t0()));

    let third = assert_err!(sv.record_use(link.id, "dev-c", t0()).await);
    assert!(matches!(third, Error::Conflict(Conflict::Exhausted)));

    let link = sv.resolve(&link.token).await.unwrap();
    assert_eq!(link.current_uses, 2);
    assert!(!link.is_active);
  }

  #[tokio::test]
  async fn test_unlimited_link_counts_unique_devices() {
    let (db, build) = setup().await;
    let sv = Share::new(&db);

    let link = sv.create("acc-1", build.id, new_link(None), t0()).await.unwrap();

    for fp in ["dev-a", "dev-b", "dev-a", "dev-a", "dev-c"] {
      sv.record_use(link.id, fp, t0()).await.unwrap();
    }

    let link = sv.resolve(&link.token).await.unwrap();
    assert_eq!(link.current_uses, 5);
    assert_eq!(link.unique_devices, 3);
    assert!(link.is_active);
  }

  async fn assert_uses_never_overshoot(db: &DatabaseConnection) {
    let build = seed(db).await;
    let sv = Share::new(db);

    let link =
      sv.create("acc-1", build.id, new_link(Some(5)), t0()).await.unwrap();

    let fingerprints: Vec<_> = (0..20).map(|i| format!("dev-{i}")).collect();
    let results = future::join_all(
      fingerprints.iter().map(|fp| sv.record_use(link.id, fp, t0())),
    )
    .await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
      .iter()
      .filter(|r| matches!(r, Err(Error::Conflict(Conflict::Exhausted))))
      .count();
    assert_eq!((ok, exhausted), (5, 15));

    let link = sv.resolve(&link.token).await.unwrap();
    assert_eq!(link.current_uses, 5);
    assert_eq!(link.unique_devices, 5);
    assert!(!link.is_active);
  }

  #[tokio::test]
  async fn test_concurrent_uses_never_overshoot() {
    let db = setup_test_db().await;
    assert_uses_never_overshoot(&db).await;
  }

  #[tokio::test]
  async fn test_concurrent_uses_never_overshoot_on_pool() {
    let (_dir, db) = file_db().await;
    assert_uses_never_overshoot(&db).await;
  }

  #[tokio::test]
  async fn test_unknown_link_use() {
    let (db, _) = setup().await;
    let result = Share::new(&db).record_use(404, "dev-a", t0()).await;
    assert!(matches!(result, Err(Error::LinkNotFound)));
  }
}
