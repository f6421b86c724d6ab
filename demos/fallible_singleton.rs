use std::sync::atomic::{AtomicBool, Ordering};

use once_kit::Singleton;

static BACKEND_UP: AtomicBool = AtomicBool::new(false);

fn connect() -> Result<String, &'static str> {
   if BACKEND_UP.load(Ordering::SeqCst) {
      Ok("connection#1".to_string())
   } else {
      Err("backend not reachable")
   }
}

fn main() {
   let connection: Singleton<String, _> = Singleton::new(connect);

   match connection.get_instance() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e} (cause: {})", e.cause()),
   }
   assert!(!connection.is_initialized());

   BACKEND_UP.store(true, Ordering::SeqCst);
   let conn = connection.get_instance().expect("retry should succeed");
   println!("Got {conn} after {} attempts", connection.attempts());
   assert_eq!(connection.attempts(), 2);
}
