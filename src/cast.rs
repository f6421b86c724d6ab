//! Checked narrowing of type-erased values.
//!
//! Every function here either hands back a `T` or tells the caller it could
//! not; none of them reinterpret a value as a type it does not have.

use core::any::{type_name, Any};

use tracing::trace;

/// Borrows `value` as a `T` if that is its concrete type.
pub fn narrow<T: Any>(value: &dyn Any) -> Option<&T> {
   let narrowed = value.downcast_ref::<T>();
   if narrowed.is_none() {
      trace!(target_type = type_name::<T>(), "value is not of the requested type");
   }
   narrowed
}

/// Unboxes `value` as a `T`, or gives the box back untouched.
pub fn narrow_boxed<T: Any>(value: Box<dyn Any>) -> Result<T, Box<dyn Any>> {
   value.downcast::<T>().map(|boxed| *boxed)
}

/// Borrows `value` as a `T`, falling back to `default`.
pub fn narrow_or<'a, T: Any>(value: &'a dyn Any, default: &'a T) -> &'a T {
   narrow(value).unwrap_or(default)
}
