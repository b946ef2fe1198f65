//! Expiry policy: the write-side settings, the read-side policy and the
//! pure access decision over a build snapshot.

use serde::{Deserialize, Serialize};

use crate::{
  entity::{ExpiryType, account, build},
  prelude::*,
};

/// Hard ceiling on how long a time policy may keep a build alive,
/// counted from the build's creation.
pub const MAX_EXPIRY_DAYS: i64 = 30;

/// Expiry settings as submitted by an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "expiry_type", rename_all = "snake_case")]
pub enum Expiry {
  #[default]
  None,
  Time {
    expiry_time_days: i32,
  },
  Downloads {
    expiry_download_limit: i32,
  },
  Devices {
    expiry_device_limit: i32,
  },
  Combined {
    #[serde(default)]
    expiry_time_days: Option<i32>,
    #[serde(default)]
    expiry_download_limit: Option<i32>,
    #[serde(default)]
    expiry_device_limit: Option<i32>,
  },
}

/// Validated expiry as it is stored on a build row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
  pub expiry_type: ExpiryType,
  pub expires_at: Option<DateTime>,
  pub expiry_time_days: Option<i32>,
  pub expiry_download_limit: Option<i32>,
  pub expiry_device_limit: Option<i32>,
}

/// Reduces `requested` to what is left of the 30 day window since
/// `created_at`, never below one day.
pub fn clamp_days(
  requested: i32,
  created_at: DateTime,
  now: DateTime,
) -> Result<i32> {
  if requested < 1 {
    return Err(Error::validation("expiry_time_days must be at least 1"));
  }

  let elapsed = (now - created_at).num_days().max(0);
  let ceiling = (MAX_EXPIRY_DAYS - elapsed).max(1);

  Ok((requested as i64).min(ceiling) as i32)
}

fn limit(value: i32, field: &str) -> Result<i32> {
  if value < 1 {
    return Err(Error::validation(format!("{field} must be at least 1")));
  }
  Ok(value)
}

impl Expiry {
  /// Validates the settings against a build created at `created_at`.
  pub fn resolve(self, created_at: DateTime, now: DateTime) -> Result<Columns> {
    let days = |d: i32| clamp_days(d, created_at, now);
    let expires = |d: i32| created_at + TimeDelta::days(d as i64);

    let columns = match self {
      Expiry::None => Columns {
        expiry_type: ExpiryType::None,
        expires_at: None,
        expiry_time_days: None,
        expiry_download_limit: None,
        expiry_device_limit: None,
      },
      Expiry::Time { expiry_time_days } => {
        let d = days(expiry_time_days)?;
        Columns {
          expiry_type: ExpiryType::Time,
          expires_at: Some(expires(d)),
          expiry_time_days: Some(d),
          expiry_download_limit: None,
          expiry_device_limit: None,
        }
      }
      Expiry::Downloads { expiry_download_limit } => Columns {
        expiry_type: ExpiryType::Downloads,
        expires_at: None,
        expiry_time_days: None,
        expiry_download_limit: Some(limit(
          expiry_download_limit,
          "expiry_download_limit",
        )?),
        expiry_device_limit: None,
      },
      Expiry::Devices { expiry_device_limit } => Columns {
        expiry_type: ExpiryType::Devices,
        expires_at: None,
        expiry_time_days: None,
        expiry_download_limit: None,
        expiry_device_limit: Some(limit(
          expiry_device_limit,
          "expiry_device_limit",
        )?),
      },
      Expiry::Combined {
        expiry_time_days,
        expiry_download_limit,
        expiry_device_limit,
      } => {
        let d = expiry_time_days.map(days).transpose()?;
        Columns {
          expiry_type: ExpiryType::Combined,
          expires_at: d.map(expires),
          expiry_time_days: d,
          expiry_download_limit: expiry_download_limit
            .map(|l| limit(l, "expiry_download_limit"))
            .transpose()?,
          expiry_device_limit: expiry_device_limit
            .map(|l| limit(l, "expiry_device_limit"))
            .transpose()?,
        }
      }
    };

    Ok(columns)
  }

  /// Rebuilds settings from stored columns.
  pub fn from_columns(
    ty: ExpiryType,
    days: Option<i32>,
    download_limit: Option<i32>,
    device_limit: Option<i32>,
  ) -> Result<Self> {
    let missing =
      |field: &str| Error::Internal(format!("{ty:?} expiry without {field}"));

    Ok(match ty {
      ExpiryType::None => Expiry::None,
      ExpiryType::Time => Expiry::Time {
        expiry_time_days: days.ok_or_else(|| missing("expiry_time_days"))?,
      },
      ExpiryType::Downloads => Expiry::Downloads {
        expiry_download_limit: download_limit
          .ok_or_else(|| missing("expiry_download_limit"))?,
      },
      ExpiryType::Devices => Expiry::Devices {
        expiry_device_limit: device_limit
          .ok_or_else(|| missing("expiry_device_limit"))?,
      },
      ExpiryType::Combined => Expiry::Combined {
        expiry_time_days: days,
        expiry_download_limit: download_limit,
        expiry_device_limit: device_limit,
      },
    })
  }
}

impl account::Model {
  pub fn default_expiry(&self) -> Result<Expiry> {
    Expiry::from_columns(
      self.default_expiry_type,
      self.default_expiry_time_days,
      self.default_expiry_download_limit,
      self.default_expiry_device_limit,
    )
  }
}

/// Read-side policy, each variant carries exactly what its rule needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  None,
  Time {
    expires_at: DateTime,
  },
  Downloads {
    limit: i32,
  },
  Devices {
    limit: i32,
  },
  Combined {
    expires_at: Option<DateTime>,
    download_limit: Option<i32>,
    device_limit: Option<i32>,
  },
}

/// Consistent view of the fields a decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
  pub is_enabled: bool,
  pub policy: Policy,
  pub download_count: i32,
  pub unique_devices_count: i32,
}

impl build::Model {
  pub fn policy(&self) -> Result<Policy> {
    let broken = |field: &str| {
      Error::Internal(format!("build {} has no {field}", self.id))
    };

    Ok(match self.expiry_type {
      ExpiryType::None => Policy::None,
      ExpiryType::Time => Policy::Time {
        expires_at: self.expires_at.ok_or_else(|| broken("expires_at"))?,
      },
      ExpiryType::Downloads => Policy::Downloads {
        limit: self
          .expiry_download_limit
          .ok_or_else(|| broken("expiry_download_limit"))?,
      },
      ExpiryType::Devices => Policy::Devices {
        limit: self
          .expiry_device_limit
          .ok_or_else(|| broken("expiry_device_limit"))?,
      },
      ExpiryType::Combined => Policy::Combined {
        expires_at: self.expires_at,
        download_limit: self.expiry_download_limit,
        device_limit: self.expiry_device_limit,
      },
    })
  }

  pub fn snapshot(&self) -> Result<Snapshot> {
    Ok(Snapshot {
      is_enabled: self.is_enabled,
      policy: self.policy()?,
      download_count: self.download_count,
      unique_devices_count: self.unique_devices_count,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
  Allowed,
  Disabled,
  Expired,
  DownloadLimitReached,
  DeviceLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
  pub allowed: bool,
  pub reason: Reason,
}

impl Decision {
  fn of(reason: Reason) -> Self {
    Self { allowed: reason == Reason::Allowed, reason }
  }
}

fn time_rule(expires_at: DateTime, now: DateTime) -> Option<Reason> {
  (now >= expires_at).then_some(Reason::Expired)
}

fn downloads_rule(snapshot: &Snapshot, limit: i32) -> Option<Reason> {
  (snapshot.download_count >= limit).then_some(Reason::DownloadLimitReached)
}

fn devices_rule(snapshot: &Snapshot, limit: i32) -> Option<Reason> {
  (snapshot.unique_devices_count >= limit)
    .then_some(Reason::DeviceLimitReached)
}

/// Decides whether the build may be downloaded at `now`.
pub fn evaluate(snapshot: &Snapshot, now: DateTime) -> Decision {
  if !snapshot.is_enabled {
    return Decision::of(Reason::Disabled);
  }

  let denied = match snapshot.policy {
    Policy::None => None,
    Policy::Time { expires_at } => time_rule(expires_at, now),
    Policy::Downloads { limit } => downloads_rule(snapshot, limit),
    Policy::Devices { limit } => devices_rule(snapshot, limit),
    // unset sub-limits are not evaluated
    Policy::Combined { expires_at, download_limit, device_limit } => expires_at
      .and_then(|at| time_rule(at, now))
      .or_else(|| download_limit.and_then(|l| downloads_rule(snapshot, l)))
      .or_else(|| device_limit.and_then(|l| devices_rule(snapshot, l))),
  };

  Decision::of(denied.unwrap_or(Reason::Allowed))
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn t0() -> DateTime {
    NaiveDate::from_ymd_opt(2026, 3, 1)
      .and_then(|d| d.and_hms_opt(12, 0, 0))
      .unwrap()
  }

  fn snapshot(policy: Policy, downloads: i32, devices: i32) -> Snapshot {
    Snapshot {
      is_enabled: true,
      policy,
      download_count: downloads,
      unique_devices_count: devices,
    }
  }

  #[test]
  fn test_none_policy_allows() {
    let decision = evaluate(&snapshot(Policy::None, 10_000, 10_000), t0());
    assert_eq!(decision, Decision { allowed: true, reason: Reason::Allowed });
  }

  #[test]
  fn test_disabled_overrides_every_policy() {
    let policies = [
      Policy::None,
      Policy::Time { expires_at: t0() + TimeDelta::days(5) },
      Policy::Downloads { limit: 100 },
      Policy::Devices { limit: 100 },
      Policy::Combined {
        expires_at: None,
        download_limit: None,
        device_limit: None,
      },
    ];

    for policy in policies {
      let mut snap = snapshot(policy, 0, 0);
      snap.is_enabled = false;
      let decision = evaluate(&snap, t0());
      assert!(!decision.allowed);
      assert_eq!(decision.reason, Reason::Disabled);
    }
  }

  #[test]
  fn test_one_day_time_policy() {
    let columns =
      Expiry::Time { expiry_time_days: 1 }.resolve(t0(), t0()).unwrap();
    let policy = Policy::Time { expires_at: columns.expires_at.unwrap() };

    let before = evaluate(&snapshot(policy, 0, 0), t0() + TimeDelta::hours(23));
    assert!(before.allowed);

    let after = evaluate(&snapshot(policy, 0, 0), t0() + TimeDelta::hours(25));
    assert!(!after.allowed);
    assert_eq!(after.reason, Reason::Expired);
  }

  #[test]
  fn test_download_and_device_limits() {
    let downloads = Policy::Downloads { limit: 2 };
    assert!(evaluate(&snapshot(downloads, 1, 0), t0()).allowed);
    assert_eq!(
      evaluate(&snapshot(downloads, 2, 0), t0()).reason,
      Reason::DownloadLimitReached
    );

    let devices = Policy::Devices { limit: 3 };
    assert!(evaluate(&snapshot(devices, 50, 2), t0()).allowed);
    assert_eq!(
      evaluate(&snapshot(devices, 50, 3), t0()).reason,
      Reason::DeviceLimitReached
    );
  }

  #[test]
  fn test_combined_requires_every_configured_limit() {
    let expires_at = t0() + TimeDelta::days(2);
    let policy = Policy::Combined {
      expires_at: Some(expires_at),
      download_limit: Some(5),
      device_limit: Some(3),
    };

    let times = [t0(), expires_at, expires_at + TimeDelta::hours(1)];
    for now in times {
      for downloads in 3..7 {
        for devices in 1..5 {
          let expected = now < expires_at && downloads < 5 && devices < 3;
          let decision = evaluate(&snapshot(policy, downloads, devices), now);
          assert_eq!(decision.allowed, expected, "{now} {downloads} {devices}");
        }
      }
    }
  }

  #[test]
  fn test_combined_ignores_unset_limits() {
    let policy = Policy::Combined {
      expires_at: None,
      download_limit: Some(2),
      device_limit: None,
    };

    let far_future = t0() + TimeDelta::days(365);
    assert!(evaluate(&snapshot(policy, 1, 9_999), far_future).allowed);
    assert_eq!(
      evaluate(&snapshot(policy, 2, 0), t0()).reason,
      Reason::DownloadLimitReached
    );
  }

  #[test]
  fn test_clamp_reduces_to_remaining_window() {
    let created = t0();

    for elapsed in [0, 1, 10, 29, 30, 45] {
      let now = created + TimeDelta::days(elapsed) + TimeDelta::hours(3);
      let expected = (MAX_EXPIRY_DAYS - elapsed).max(1) as i32;
      assert_eq!(clamp_days(90, created, now).unwrap(), expected);
    }

    assert_eq!(clamp_days(5, created, created).unwrap(), 5);
  }

  #[test]
  fn test_clamp_rejects_non_positive() {
    assert!(matches!(clamp_days(0, t0(), t0()), Err(Error::Validation(_))));
    assert!(matches!(clamp_days(-3, t0(), t0()), Err(Error::Validation(_))));
  }

  #[test]
  fn test_expires_at_never_passes_ceiling() {
    let created = t0();
    let ceiling = created + TimeDelta::days(MAX_EXPIRY_DAYS);

    // repeated edits at different points in the build's life
    for elapsed in [0, 7, 20, 31] {
      let now = created + TimeDelta::days(elapsed);
      let columns = Expiry::Time { expiry_time_days: 30 }
        .resolve(created, now)
        .unwrap();
      assert!(columns.expires_at.unwrap() <= ceiling);
    }
  }

  #[test]
  fn test_resolve_rejects_zero_limits() {
    let zero = Expiry::Downloads { expiry_download_limit: 0 };
    assert!(matches!(zero.resolve(t0(), t0()), Err(Error::Validation(_))));

    let combined = Expiry::Combined {
      expiry_time_days: None,
      expiry_download_limit: None,
      expiry_device_limit: Some(-1),
    };
    assert!(matches!(combined.resolve(t0(), t0()), Err(Error::Validation(_))));
  }

  #[test]
  fn test_expiry_wire_format() {
    let expiry: Expiry = json::from_str(
      r#"{"expiry_type":"combined","expiry_download_limit":10}"#,
    )
    .unwrap();

    assert_eq!(
      expiry,
      Expiry::Combined {
        expiry_time_days: None,
        expiry_download_limit: Some(10),
        expiry_device_limit: None,
      }
    );

    assert!(json::from_str::<Expiry>(r#"{"expiry_type":"weekly"}"#).is_err());
  }
}
