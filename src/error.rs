//! Error types.

use thiserror::Error;

/// A singleton factory failed to produce its instance.
///
/// Nothing was cached: the next call to
/// [`Singleton::get_instance`](crate::Singleton::get_instance) runs the
/// factory again.
#[derive(Debug, Error)]
#[error("failed to construct singleton instance of `{type_name}` (attempt {attempt})")]
pub struct ConstructionError<E> {
   type_name: &'static str,
   attempt: usize,
   #[source]
   pub(crate) cause: E,
}

impl<E> ConstructionError<E> {
   pub(crate) const fn new(type_name: &'static str, attempt: usize, cause: E) -> Self {
      Self {
         type_name,
         attempt,
         cause,
      }
   }

   /// Name of the type the factory was meant to build.
   pub fn type_name(&self) -> &'static str {
      self.type_name
   }

   /// 1-based index of the factory call that failed.
   pub fn attempt(&self) -> usize {
      self.attempt
   }

   /// The error returned by the factory.
   pub fn cause(&self) -> &E {
      &self.cause
   }

   /// Unwraps the error returned by the factory.
   pub fn into_cause(self) -> E {
      self.cause
   }
}
