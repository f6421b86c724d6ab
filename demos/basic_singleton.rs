use std::sync::atomic::{AtomicUsize, Ordering};

use once_kit::{FromFn, Singleton};

static BUILDS: AtomicUsize = AtomicUsize::new(0);
static SETTINGS: Singleton<String, FromFn<fn() -> String>> = Singleton::from_fn(load_settings);

fn load_settings() -> String {
   BUILDS.fetch_add(1, Ordering::Relaxed);
   println!("Loading settings...");
   std::thread::sleep(std::time::Duration::from_millis(50));
   "mode=production".to_string()
}

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread sees: {}", SETTINGS.instance());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(BUILDS.load(Ordering::Relaxed), 1);
   println!("Built {} time(s): {}", SETTINGS.attempts(), SETTINGS.instance());
}
