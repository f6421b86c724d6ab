//! Small building blocks: lazily built singletons, iterated hashing, ids.
//!
//! - [`Singleton<T, F>`]: holds one `T`, built by the factory `F` the first time
//!   anyone asks for it. Thread-safe, with a lock-free read once built and a
//!   lock private to each holder while building.
//! - [`IteratedHash`] / [`while_md5`]: hash a string repeatedly, optionally
//!   appending a salt per round, in lower- or uppercase hex.
//! - [`id`]: UUID and random alphanumeric identifiers.
//! - [`cast`]: checked narrowing of `dyn Any` values.
//!
//! # Examples
//!
//! ## Fallible singleton
//!
//! ```rust
//! use once_kit::Singleton;
//!
//! let port: Singleton<u16, _> = Singleton::new(|| "8080".parse::<u16>());
//!
//! assert_eq!(port.get(), None);
//! assert_eq!(*port.get_instance().unwrap(), 8080);
//! assert_eq!(port.attempts(), 1);
//! ```
//!
//! ## Salted rounds
//!
//! ```rust
//! use once_kit::while_md5;
//!
//! let once = while_md5(Some("abc"), 1, false, &[Some("x")]).unwrap();
//! let twice = while_md5(Some("abc"), 2, false, &[Some("x"), Some("y")]).unwrap();
//! let manual = while_md5(Some(format!("{once}y").as_str()), 1, false, &[None::<&str>]);
//! assert_eq!(Some(twice), manual);
//! ```

/// Error types.
mod error;

/// Iterated hex hashing.
mod hash;

/// Lazy singleton holder.
mod singleton;

/// Internal synchronization state management.
mod state;

pub mod cast;
pub mod id;

pub use error::ConstructionError;
pub use hash::{while_md5, HexCase, HexDigest, IteratedHash, Md5, Sha256, NO_SALTS};
pub use singleton::{Factory, FromFn, Singleton};
