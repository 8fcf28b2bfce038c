//! Background session garbage collection

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use routemux::session::{spawn_gc, SessionProvider};

#[derive(Default)]
struct CountingProvider {
    sweeps: AtomicUsize,
    panic_on_first: bool,
}

impl SessionProvider for CountingProvider {
    fn get(&self, _sid: &str, _key: &str) -> Option<String> {
        None
    }
    fn set(&self, _sid: &str, _key: &str, _value: String) {}
    fn delete(&self, _sid: &str, _key: &str) {}
    fn flush(&self, _sid: &str) {}
    fn gc(&self) {
        let n = self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first && n == 0 {
            panic!("first sweep fails");
        }
    }
}

fn wait_for(provider: &CountingProvider, at_least: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if provider.sweeps.load(Ordering::SeqCst) >= at_least {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_gc_runs_periodically_and_stops() {
    let provider = Arc::new(CountingProvider::default());
    let handle = spawn_gc(provider.clone(), Duration::from_millis(10)).unwrap();
    assert!(wait_for(&provider, 3));
    handle.stop();

    let after_stop = provider.sweeps.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(provider.sweeps.load(Ordering::SeqCst), after_stop);
}

#[test]
fn test_gc_survives_a_panicking_sweep() {
    let provider = Arc::new(CountingProvider {
        panic_on_first: true,
        ..CountingProvider::default()
    });
    let handle = spawn_gc(provider.clone(), Duration::from_millis(10)).unwrap();
    assert!(wait_for(&provider, 2));
    drop(handle);
}

#[test]
fn test_dropping_the_handle_stops_gc() {
    let provider = Arc::new(CountingProvider::default());
    {
        let _handle = spawn_gc(provider.clone(), Duration::from_secs(3600)).unwrap();
    }
    assert_eq!(provider.sweeps.load(Ordering::SeqCst), 0);
}
