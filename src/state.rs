//! Per-holder initialization state.
//!
//! A [`Singleton`](crate::Singleton) owns exactly one [`InitState`]: a single
//! `AtomicU8` doubling as the "is it built yet" flag read on the fast path and
//! as the construction lock taken on the slow path. Blocking is done through
//! `parking_lot_core`, keyed on the address of the atomic, so two holders never
//! contend on a shared lock.
//!
//! Bit layout:
//! - bit 0 `READY`: the instance slot is initialized
//! - bit 1 `BUILDING`: some caller is running the factory
//! - bit 2 `PARKED`: at least one caller is parked waiting for `BUILDING` to clear
//! - bits 3-7: generation, bumped on every release so a parked caller never
//!   mistakes a later `BUILDING` phase for the one it went to sleep on

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

#[repr(transparent)]
pub(crate) struct InitState(AtomicU8);

impl InitState {
   const READY: u8 = 1;
   const BUILDING: u8 = 2;
   const PARKED: u8 = 4;
   const GENERATION_STEP: u8 = 8;
   const GENERATION_MASK: u8 = !(Self::READY | Self::BUILDING | Self::PARKED);

   #[inline(always)]
   const fn bump_generation(state: u8) -> u8 {
      (state & Self::GENERATION_MASK).wrapping_add(Self::GENERATION_STEP) & Self::GENERATION_MASK
   }

   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Whether the instance slot has been written.
   ///
   /// `Acquire` pairs with the `Release` in [`BuildGuard::publish`], so a
   /// `true` result makes the written instance visible to the caller.
   #[inline]
   pub(crate) fn is_ready(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::READY != 0
   }

   fn wake_all(&self) {
      // SAFETY: the key is the address of our atomic, the same key `park_until_changed` uses.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   fn park_until_changed(&self, observed: u8) {
      // SAFETY: see `wake_all`. The validate closure runs under the bucket lock,
      // so a wake issued after the state moved on cannot be missed.
      unsafe {
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == observed,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Moves to `next` (with a fresh generation) and wakes parked callers.
   fn release(&self, next: u8) {
      let current = self.0.load(Ordering::Relaxed);
      let previous = self.0.swap(next | Self::bump_generation(current), Ordering::Release);
      if previous & Self::PARKED != 0 {
         self.wake_all();
      }
   }

   /// One non-blocking attempt at the lock.
   ///
   /// - `Ok(None)`: already ready, nothing to build
   /// - `Ok(Some(guard))`: this caller now builds
   /// - `Err(state)`: someone else is building; `state` has `PARKED` set and is
   ///   the value to park on
   fn try_acquire(&self) -> Result<Option<BuildGuard<'_>>, u8> {
      loop {
         let state = self.0.load(Ordering::Acquire);
         if state & Self::READY != 0 {
            return Ok(None);
         }

         if state & Self::BUILDING == 0 {
            let building = state | Self::BUILDING;
            if self
               .0
               .compare_exchange_weak(state, building, Ordering::Acquire, Ordering::Relaxed)
               .is_ok()
            {
               return Ok(Some(BuildGuard { state: self }));
            }
            core::hint::spin_loop();
            continue;
         }

         if state & Self::PARKED != 0 {
            return Err(state);
         }
         let parked = state | Self::PARKED;
         if self
            .0
            .compare_exchange_weak(state, parked, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
         {
            return Err(parked);
         }
         core::hint::spin_loop();
      }
   }

   /// Takes the build lock, parking the thread while another caller builds.
   ///
   /// Returns `None` once the holder is ready, so losers of the race go straight
   /// to reading the instance.
   pub(crate) fn acquire(&self) -> Option<BuildGuard<'_>> {
      loop {
         match self.try_acquire() {
            Ok(outcome) => return outcome,
            Err(observed) => self.park_until_changed(observed),
         }
      }
   }

   /// Yields to the runtime before falling back to parking the worker thread.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   const ASYNC_YIELD_BUDGET: u32 = 512;

   /// Async flavour of [`acquire`](Self::acquire).
   ///
   /// While another caller builds, the task yields. Once the yield budget is
   /// spent, a task on the multi-thread runtime parks inside `block_in_place`;
   /// on the current-thread runtime, which cannot block in place, it keeps
   /// yielding until the builder is done.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn acquire_async(&self) -> Option<BuildGuard<'_>> {
      let mut yields = 0u32;
      loop {
         if let Ok(outcome) = self.try_acquire() {
            return outcome;
         }
         if yields >= Self::ASYNC_YIELD_BUDGET {
            if let Some(outcome) = self.acquire_in_place() {
               return outcome;
            }
         } else {
            yields += 1;
         }
         tokio::task::yield_now().await;
      }
   }

   /// Blocking [`acquire`](Self::acquire) wrapped in `block_in_place`.
   ///
   /// `None` when the current runtime cannot block in place, in which case the
   /// caller has to keep yielding.
   #[cfg(feature = "async-tokio-mt")]
   fn acquire_in_place(&self) -> Option<Option<BuildGuard<'_>>> {
      use tokio::runtime::{Handle, RuntimeFlavor};

      let handle = Handle::try_current().ok()?;
      if !matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
         return None;
      }
      Some(tokio::task::block_in_place(|| self.acquire()))
   }

   #[cfg(all(feature = "async-tokio", not(feature = "async-tokio-mt")))]
   fn acquire_in_place(&self) -> Option<Option<BuildGuard<'_>>> {
      None
   }
}

/// Proof that the caller holds the build lock.
///
/// [`publish`](Self::publish) marks the holder ready. Dropping the guard
/// without publishing (factory error or panic) puts the holder back to
/// uninitialized and wakes everyone parked on it, so one of them can retry.
pub(crate) struct BuildGuard<'a> {
   state: &'a InitState,
}

impl BuildGuard<'_> {
   /// The instance slot must be fully written before this is called.
   pub(crate) fn publish(self) {
      self.state.release(InitState::READY);
      mem::forget(self);
   }
}

impl Drop for BuildGuard<'_> {
   fn drop(&mut self) {
      self.state.release(0);
   }
}
