use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use once_kit::{ConstructionError, Factory, FromFn, Singleton};
use tracing_test::traced_test;

#[derive(Debug)]
struct Registry {
   name: String,
}

#[test]
fn test_factory_not_called_before_first_access() {
   let calls = AtomicUsize::new(0);
   let holder = Singleton::from_fn(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      42
   });

   assert!(!holder.is_initialized());
   assert_eq!(holder.get(), None);
   assert_eq!(holder.attempts(), 0);
   assert_eq!(calls.load(Ordering::SeqCst), 0);

   assert_eq!(holder.instance(), &42);
   assert!(holder.is_initialized());
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_repeated_access_returns_same_instance() {
   let calls = AtomicUsize::new(0);
   let holder = Singleton::from_fn(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      Registry {
         name: "primary".to_string(),
      }
   });

   let first = holder.instance();
   let second = holder.get_instance().unwrap();
   let third = holder.get().unwrap();
   assert!(std::ptr::eq(first, second));
   assert!(std::ptr::eq(first, third));
   assert_eq!(first.name, "primary");
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_factory_is_retried() {
   let calls = AtomicUsize::new(0);
   let holder: Singleton<String, _> = Singleton::new(|| {
      if calls.fetch_add(1, Ordering::SeqCst) == 0 {
         Err("backend unavailable")
      } else {
         Ok("connected".to_string())
      }
   });

   let err = holder.get_instance().unwrap_err();
   assert_eq!(*err.cause(), "backend unavailable");
   assert_eq!(err.attempt(), 1);
   assert_eq!(err.type_name(), std::any::type_name::<String>());
   assert!(!holder.is_initialized());
   assert_eq!(holder.get(), None);

   assert_eq!(holder.get_instance().unwrap(), "connected");
   assert_eq!(holder.attempts(), 2);

   // Built now: the factory is not consulted again.
   assert_eq!(holder.get_instance().unwrap(), "connected");
   assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_construction_error_display_and_source() {
   let holder: Singleton<u16, _> = Singleton::new(|| "not a port".parse::<u16>());
   let err = holder.get_instance().unwrap_err();

   assert_eq!(
      err.to_string(),
      "failed to construct singleton instance of `u16` (attempt 1)"
   );
   let source = std::error::Error::source(&err).expect("cause must be exposed as source");
   assert_eq!(source.to_string(), err.cause().to_string());
   let _: std::num::ParseIntError = err.into_cause();
}

#[test]
fn test_panicking_factory_leaves_holder_usable() {
   let calls = Arc::new(AtomicUsize::new(0));
   let holder = Arc::new(Singleton::from_fn({
      let calls = Arc::clone(&calls);
      move || {
         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first build blows up");
         }
         7
      }
   }));

   let result = thread::spawn({
      let holder = Arc::clone(&holder);
      move || *holder.instance()
   })
   .join();
   assert!(result.is_err());
   assert!(!holder.is_initialized());

   assert_eq!(holder.instance(), &7);
   assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_multi_thread_single_construction() {
   let calls = Arc::new(AtomicUsize::new(0));
   let holder = Arc::new(Singleton::from_fn({
      let calls = Arc::clone(&calls);
      move || {
         calls.fetch_add(1, Ordering::SeqCst);
         thread::sleep(Duration::from_millis(20));
         Registry {
            name: "shared".to_string(),
         }
      }
   }));
   let barrier = Arc::new(Barrier::new(16));

   let threads: Vec<_> = (0..16)
      .map(|_| {
         let holder = Arc::clone(&holder);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            holder.instance() as *const Registry as usize
         })
      })
      .collect();

   let addresses: Vec<usize> = threads.into_iter().map(|t| t.join().unwrap()).collect();
   let expected = holder.get().unwrap() as *const Registry as usize;
   assert!(addresses.iter().all(|&addr| addr == expected));
   assert_eq!(calls.load(Ordering::SeqCst), 1);
   assert_eq!(holder.attempts(), 1);
}

#[test]
fn test_multi_thread_failure_then_success() {
   let calls = Arc::new(AtomicUsize::new(0));
   let holder: Arc<Singleton<u64, _>> = Arc::new(Singleton::new({
      let calls = Arc::clone(&calls);
      move || {
         thread::sleep(Duration::from_millis(10));
         match calls.fetch_add(1, Ordering::SeqCst) {
            0 => Err("cold start"),
            n => Ok(n as u64),
         }
      }
   }));

   let threads: Vec<_> = (0..8)
      .map(|_| {
         let holder = Arc::clone(&holder);
         thread::spawn(move || holder.get_instance().map(|v| *v).map_err(|e| e.attempt()))
      })
      .collect();

   let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
   // Exactly one caller saw the failure; everyone else got the instance from the retry.
   assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
   assert!(results.contains(&Err(1)));
   assert!(results.iter().filter_map(|r| r.ok()).all(|v| v == 1));
   assert_eq!(holder.get(), Some(&1));
   assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_holders_do_not_share_a_lock() {
   // Building one holder from inside another's factory must not deadlock.
   let inner = Singleton::from_fn(|| 5);
   let outer = Singleton::from_fn(|| *inner.instance() * 2);
   assert_eq!(outer.instance(), &10);
   assert_eq!(inner.get(), Some(&5));
}

static GLOBAL: Singleton<Vec<&'static str>, FromFn<fn() -> Vec<&'static str>>> =
   Singleton::from_fn(|| vec!["a", "b"]);

#[test]
fn test_static_holder() {
   let handles: Vec<_> = (0..4).map(|_| thread::spawn(|| GLOBAL.instance().len())).collect();
   for handle in handles {
      assert_eq!(handle.join().unwrap(), 2);
   }
   assert_eq!(GLOBAL.attempts(), 1);
}

#[derive(Default)]
struct SettingsLoader {
   prefix: &'static str,
}

impl Factory<String> for SettingsLoader {
   type Error = Infallible;

   fn create(&self) -> Result<String, Infallible> {
      Ok(format!("{}settings", self.prefix))
   }
}

#[test]
fn test_default_holder_uses_default_factory() {
   let holder: Singleton<String, SettingsLoader> = Singleton::default();
   assert!(!holder.is_initialized());
   assert_eq!(holder.factory().prefix, "");
   assert_eq!(holder.instance(), "settings");
   assert_eq!(holder.attempts(), 1);
}

#[test]
fn test_infallible_result_factory() {
   let holder: Singleton<i32, _> = Singleton::new(|| Ok::<_, Infallible>(3));
   assert_eq!(holder.instance(), &3);
}

#[test]
#[traced_test]
fn test_failure_is_logged() {
   let holder: Singleton<i32, _> = Singleton::new(|| Err::<i32, _>("nope"));
   let err: ConstructionError<&str> = holder.get_instance().unwrap_err();
   assert_eq!(err.attempt(), 1);
   assert!(logs_contain("constructing singleton instance"));
   assert!(logs_contain("singleton factory failed"));
}

#[tokio::test]
async fn test_get_instance_async() {
   let calls = Arc::new(AtomicUsize::new(0));
   let holder = Singleton::from_fn({
      let calls = Arc::clone(&calls);
      move || {
         calls.fetch_add(1, Ordering::SeqCst);
         "async".to_string()
      }
   });

   assert_eq!(holder.get_instance_async().await.unwrap(), "async");
   assert_eq!(holder.get_instance_async().await.unwrap(), "async");
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_get_instance_async_concurrent() {
   let calls = Arc::new(AtomicUsize::new(0));
   let holder = Arc::new(Singleton::from_fn({
      let calls = Arc::clone(&calls);
      move || {
         calls.fetch_add(1, Ordering::SeqCst);
         thread::sleep(Duration::from_millis(20));
         99u32
      }
   }));

   let tasks: Vec<_> = (0..16)
      .map(|_| {
         let holder = Arc::clone(&holder);
         tokio::spawn(async move { *holder.get_instance_async().await.unwrap() })
      })
      .collect();

   for task in tasks {
      assert_eq!(task.await.unwrap(), 99);
   }
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_instance_async_waits_on_current_thread_runtime() {
   let started = Arc::new(Barrier::new(2));
   let calls = Arc::new(AtomicUsize::new(0));
   let holder = Arc::new(Singleton::from_fn({
      let started = Arc::clone(&started);
      let calls = Arc::clone(&calls);
      move || {
         calls.fetch_add(1, Ordering::SeqCst);
         started.wait();
         thread::sleep(Duration::from_millis(300));
         "slow build".to_string()
      }
   }));

   let builder = thread::spawn({
      let holder = Arc::clone(&holder);
      move || holder.instance().clone()
   });
   // The build is now running on another thread and will outlast the yield budget.
   started.wait();

   let value = holder.get_instance_async().await.unwrap();
   assert_eq!(value, "slow build");
   assert_eq!(builder.join().unwrap(), "slow build");
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_instance_async_failure() {
   let holder: Singleton<u8, _> = Singleton::new(|| Err::<u8, _>("down"));
   let err = holder.get_instance_async().await.unwrap_err();
   assert_eq!(*err.cause(), "down");
   assert!(!holder.is_initialized());
}
