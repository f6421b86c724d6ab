//! Lazily constructed, thread-safe singleton holder.
//!
//! A [`Singleton<T, F>`] owns a factory `F` and a slot for one `T`. The slot is
//! filled by the first successful call to [`Singleton::get_instance`]; every
//! later call, from any thread, gets a reference to that same instance.
//!
//! Reads of an initialized holder are a single atomic load. Callers that race
//! on first access serialize on the holder's own [`InitState`]: one of them runs
//! the factory, the rest park until it finishes. If the factory fails (or
//! panics) nothing is stored, the parked callers wake up, and the next one in
//! line calls the factory again.

use core::any::type_name;
use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::{fmt, mem};

use tracing::{debug, warn};

use crate::error::ConstructionError;
use crate::state::{BuildGuard, InitState};

/// Something that can build a `T`.
///
/// Implemented for every `Fn() -> Result<T, E>` closure or function. Use
/// [`FromFn`] (or [`Singleton::from_fn`]) to wrap a factory that cannot fail.
///
/// The factory is borrowed, not consumed, because a failed attempt leaves the
/// holder uninitialized and a later caller will call it again.
pub trait Factory<T> {
   /// What a failed build returns.
   type Error;

   /// Builds a fresh `T`. Called again after a failed attempt.
   fn create(&self) -> Result<T, Self::Error>;
}

impl<T, E, F> Factory<T> for F
where
   F: Fn() -> Result<T, E>,
{
   type Error = E;

   #[inline]
   fn create(&self) -> Result<T, E> {
      self()
   }
}

/// Adapts an infallible `Fn() -> T` into a [`Factory`].
#[derive(Clone, Copy)]
pub struct FromFn<G>(pub G);

impl<T, G> Factory<T> for FromFn<G>
where
   G: Fn() -> T,
{
   type Error = Infallible;

   #[inline]
   fn create(&self) -> Result<T, Infallible> {
      Ok((self.0)())
   }
}

impl<G> fmt::Debug for FromFn<G> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str("FromFn(..)")
   }
}

/// Holds at most one `T`, built on first access by the factory `F`.
///
/// The lock guarding construction belongs to this holder alone; unrelated
/// singletons never wait on each other.
///
/// ```
/// use once_kit::{FromFn, Singleton};
///
/// static GREETING: Singleton<String, FromFn<fn() -> String>> =
///    Singleton::from_fn(|| "hello".to_owned());
///
/// assert!(!GREETING.is_initialized());
/// assert_eq!(GREETING.instance(), "hello");
/// assert!(core::ptr::eq(GREETING.instance(), GREETING.instance()));
/// ```
pub struct Singleton<T, F> {
   factory: F,
   instance: UnsafeCell<mem::MaybeUninit<T>>,
   state: InitState,
   attempts: AtomicUsize,
}

impl<T, F> Singleton<T, F> {
   /// Creates an empty holder. The factory is not called.
   #[inline]
   #[must_use]
   pub const fn new(factory: F) -> Self {
      Self {
         factory,
         instance: UnsafeCell::new(mem::MaybeUninit::uninit()),
         state: InitState::new(),
         attempts: AtomicUsize::new(0),
      }
   }

   /// Whether the instance has been built. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.state.is_ready()
   }

   /// Returns the instance if it has already been built. Never blocks and never
   /// calls the factory.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_initialized() {
         // SAFETY: the slot is written before the state is published as ready.
         Some(unsafe { self.instance_unchecked() })
      } else {
         None
      }
   }

   /// Number of times the factory has been called, successful or not.
   #[inline]
   pub fn attempts(&self) -> usize {
      self.attempts.load(Ordering::Relaxed)
   }

   /// The factory this holder builds with.
   #[inline]
   pub fn factory(&self) -> &F {
      &self.factory
   }

   /// Consumes the holder, returning the instance if it was built.
   pub fn into_inner(mut self) -> Option<T> {
      if !self.is_initialized() {
         return None;
      }
      // SAFETY: initialized, and `self` is forgotten below so the value is not dropped twice.
      let value = unsafe { self.instance.get_mut().assume_init_read() };
      // SAFETY: the instance was moved out above; only the factory is left to drop.
      unsafe { core::ptr::drop_in_place(&mut self.factory) };
      mem::forget(self);
      Some(value)
   }

   /// # Safety
   ///
   /// The holder must be initialized.
   #[inline]
   unsafe fn instance_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized(), "singleton read before initialization");
      unsafe { (*self.instance.get()).assume_init_ref() }
   }
}

impl<T, G> Singleton<T, FromFn<G>>
where
   G: Fn() -> T,
{
   /// Creates an empty holder around a factory that cannot fail.
   #[inline]
   #[must_use]
   pub const fn from_fn(factory: G) -> Self {
      Self::new(FromFn(factory))
   }
}

impl<T, F> Singleton<T, F>
where
   F: Factory<T>,
{
   /// Returns the instance, building it with the factory on first use.
   ///
   /// Concurrent callers block until the one running the factory is done and
   /// then all observe the same instance. On failure the factory's error is
   /// returned to the caller that ran it, nothing is cached, and a later call
   /// retries.
   pub fn get_instance(&self) -> Result<&T, ConstructionError<F::Error>> {
      if let Some(instance) = self.get() {
         return Ok(instance);
      }
      self.build(|state| state.acquire())?;
      // SAFETY: `build` only returns `Ok` once the holder is ready.
      Ok(unsafe { self.instance_unchecked() })
   }

   /// Async counterpart of [`get_instance`](Self::get_instance).
   ///
   /// While another caller is building, this yields to the runtime rather than
   /// parking the worker thread straight away. It works on both the
   /// current-thread and the multi-thread runtime.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_instance_async(&self) -> Result<&T, ConstructionError<F::Error>> {
      if let Some(instance) = self.get() {
         return Ok(instance);
      }
      let guard = self.state.acquire_async().await;
      self.build(move |_| guard)?;
      // SAFETY: `build` only returns `Ok` once the holder is ready.
      Ok(unsafe { self.instance_unchecked() })
   }

   #[cold]
   fn build<'a>(
      &'a self,
      acquire: impl FnOnce(&'a InitState) -> Option<BuildGuard<'a>>,
   ) -> Result<(), ConstructionError<F::Error>> {
      let Some(guard) = acquire(&self.state) else {
         // Someone else finished while we waited.
         return Ok(());
      };

      let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
      let type_name = type_name::<T>();
      debug!(type_name, attempt, "constructing singleton instance");

      // A panic here drops `guard`, which resets the state and wakes waiters.
      match self.factory.create() {
         Ok(value) => {
            // SAFETY: holding the build lock gives exclusive access to the slot.
            unsafe { (*self.instance.get()).write(value) };
            guard.publish();
            debug!(type_name, attempt, "singleton instance ready");
            Ok(())
         }
         Err(cause) => {
            drop(guard);
            warn!(type_name, attempt, "singleton factory failed, instance left unset");
            Err(ConstructionError::new(type_name, attempt, cause))
         }
      }
   }
}

impl<T, F> Singleton<T, F>
where
   F: Factory<T, Error = Infallible>,
{
   /// Returns the instance, building it on first use. Only available when
   /// the factory cannot fail.
   #[inline]
   pub fn instance(&self) -> &T {
      match self.get_instance() {
         Ok(instance) => instance,
         Err(err) => match err.cause {},
      }
   }
}

// SAFETY: shared access hands out `&T` across threads (needs `T: Sync`), the
// instance may be built on one thread and dropped on another (needs `T: Send`),
// and the factory is called through `&F` from whichever thread wins the race.
unsafe impl<T: Send + Sync, F: Sync> Sync for Singleton<T, F> {}
// SAFETY: moving the holder moves the factory and, if present, the instance.
unsafe impl<T: Send, F: Send> Send for Singleton<T, F> {}

impl<T, F: Default> Default for Singleton<T, F> {
   /// An empty holder around `F::default()`, for named factory types.
   fn default() -> Self {
      Self::new(F::default())
   }
}

impl<T: fmt::Debug, F> fmt::Debug for Singleton<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("Singleton");
      match self.get() {
         Some(instance) => d.field("instance", instance),
         None => d.field("instance", &format_args!("<uninit>")),
      };
      d.field("attempts", &self.attempts()).finish()
   }
}

impl<T, F> Drop for Singleton<T, F> {
   fn drop(&mut self) {
      if self.is_initialized() {
         // SAFETY: initialized, and we have exclusive access.
         unsafe { self.instance.get_mut().assume_init_drop() };
      }
   }
}
