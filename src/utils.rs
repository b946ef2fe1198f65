use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

/// 256 random bits, url-safe. Used wherever a value acts as a bearer
/// credential.
pub fn token() -> String {
  let mut bytes = [0u8; 32];
  bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
  bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Eight character display alias.
pub fn short_id() -> String {
  // first six bytes of a v4 uuid carry no version bits
  URL_SAFE_NO_PAD.encode(&Uuid::new_v4().as_bytes()[..6])
}

pub fn event_id() -> String {
  Uuid::new_v4().to_string()
}

pub fn required(value: &str, field: &str) -> crate::Result<()> {
  if value.trim().is_empty() {
    return Err(crate::Error::validation(format!("{field} must not be empty")));
  }
  Ok(())
}
