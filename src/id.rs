//! Random identifiers.

use rand::distr::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// A random (v4) UUID in hyphenated lowercase form, 36 characters.
pub fn uuid() -> String {
   Uuid::new_v4().hyphenated().to_string()
}

/// A random (v4) UUID without hyphens, 32 lowercase hex characters.
pub fn simple_uuid() -> String {
   Uuid::new_v4().simple().to_string()
}

/// `len` random characters drawn from `[A-Za-z0-9]`.
pub fn random_id(len: usize) -> String {
   rand::rng()
      .sample_iter(Alphanumeric)
      .take(len)
      .map(char::from)
      .collect()
}
