//! Repeated, optionally salted, hex hashing.
//!
//! Each round hashes the previous round's hex output (with that round's salt
//! appended, if there is one) and the last round's output is the result.

use sha2::Digest as _;
use tracing::trace;

/// Letter case of rendered hex digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HexCase {
   #[default]
   Lower,
   Upper,
}

impl HexCase {
   #[inline]
   pub const fn from_uppercase(uppercase: bool) -> Self {
      if uppercase {
         Self::Upper
      } else {
         Self::Lower
      }
   }
}

impl From<bool> for HexCase {
   /// `true` selects [`HexCase::Upper`].
   fn from(uppercase: bool) -> Self {
      Self::from_uppercase(uppercase)
   }
}

/// A digest function that renders its output as hex text.
pub trait HexDigest {
   /// Hashes `input` and renders the digest as hex in the given case.
   fn digest_hex(&self, input: &[u8], case: HexCase) -> String;
}

/// MD5, 32 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5;

impl HexDigest for Md5 {
   fn digest_hex(&self, input: &[u8], case: HexCase) -> String {
      let digest = md5::compute(input);
      match case {
         HexCase::Lower => format!("{digest:x}"),
         HexCase::Upper => format!("{digest:X}"),
      }
   }
}

/// SHA-256, 64 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256;

impl HexDigest for Sha256 {
   fn digest_hex(&self, input: &[u8], case: HexCase) -> String {
      let digest = sha2::Sha256::digest(input);
      match case {
         HexCase::Lower => hex::encode(digest),
         HexCase::Upper => hex::encode_upper(digest),
      }
   }
}

/// Salt list for callers that have none.
pub const NO_SALTS: &[Option<&str>] = &[];

/// Iterated hash with a fixed digest and output case.
///
/// ```
/// use once_kit::{HexCase, IteratedHash, NO_SALTS};
///
/// let md5: IteratedHash = IteratedHash::default();
/// assert_eq!(md5.hash("abc", 1, NO_SALTS), "900150983cd24fb0d6963f7d28e17f72");
///
/// let upper = md5.case(HexCase::Upper);
/// assert_eq!(upper.hash("abc", 1, NO_SALTS), "900150983CD24FB0D6963F7D28E17F72");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IteratedHash<D = Md5> {
   digest: D,
   case: HexCase,
}

impl<D: HexDigest> IteratedHash<D> {
   pub const fn new(digest: D) -> Self {
      Self {
         digest,
         case: HexCase::Lower,
      }
   }

   /// Sets the case used for every round's output.
   #[must_use]
   pub fn case(mut self, case: HexCase) -> Self {
      self.case = case;
      self
   }

   /// The case every round's output is rendered in.
   pub fn hex_case(&self) -> HexCase {
      self.case
   }

   /// Hashes `data` `iterations` times.
   ///
   /// Round `i` appends `salts[i]` to its input when that entry exists and is
   /// `Some`. Rounds past the end of `salts`, including round `salts.len()`,
   /// are unsalted; salts past the last round are ignored. Zero iterations
   /// return `data` as is.
   pub fn hash<S: AsRef<str>>(
      &self,
      data: &str,
      iterations: usize,
      salts: &[Option<S>],
   ) -> String {
      let mut current = data.to_owned();
      for round in 0..iterations {
         let salt = salts.get(round).and_then(Option::as_ref);
         if let Some(salt) = salt {
            current.push_str(salt.as_ref());
         }
         current = self.digest.digest_hex(current.as_bytes(), self.case);
         trace!(round, salted = salt.is_some(), "hash round done");
      }
      current
   }

   /// [`hash`](Self::hash) over optional input: `None` stays `None`.
   pub fn apply<S: AsRef<str>>(
      &self,
      data: Option<&str>,
      iterations: usize,
      salts: &[Option<S>],
   ) -> Option<String> {
      data.map(|data| self.hash(data, iterations, salts))
   }
}

/// Repeated MD5 of `data`, see [`IteratedHash::hash`].
///
/// Absent `data` or zero `iterations` return the input unchanged.
///
/// ```
/// use once_kit::{while_md5, NO_SALTS};
///
/// assert_eq!(while_md5(None, 5, false, NO_SALTS), None);
/// assert_eq!(while_md5(Some("abc"), 0, false, NO_SALTS).as_deref(), Some("abc"));
/// ```
pub fn while_md5<S: AsRef<str>>(
   data: Option<&str>,
   iterations: usize,
   uppercase: bool,
   salts: &[Option<S>],
) -> Option<String> {
   IteratedHash::new(Md5)
      .case(HexCase::from_uppercase(uppercase))
      .apply(data, iterations, salts)
}
