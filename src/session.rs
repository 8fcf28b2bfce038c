//! Session storage boundary and background garbage collection.
//!
//! Storage engines live outside this crate. The router only needs the
//! [`SessionProvider`] operations, plus a periodic [`SessionProvider::gc`] call
//! that runs on its own thread and never blocks request dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

/// Session store operations keyed by session id.
pub trait SessionProvider: Send + Sync {
    fn get(&self, sid: &str, key: &str) -> Option<String>;
    fn set(&self, sid: &str, key: &str, value: String);
    fn delete(&self, sid: &str, key: &str);
    /// Drop every value stored for `sid`.
    fn flush(&self, sid: &str);
    /// Expire stale sessions.
    fn gc(&self);
}

/// Handle to the garbage collection thread started by [`spawn_gc`].
///
/// Dropping the handle stops the thread as well.
pub struct GcHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl GcHandle {
    /// Stop collecting and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // Receiver gone means the thread already exited.
            tx.send(()).ok();
        }
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                error!("Session GC thread panicked");
            }
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Call `provider.gc()` every `interval` on a dedicated thread.
///
/// A panic inside `gc()` is logged and the next tick still runs.
///
/// # Errors
///
/// Returns an error if the OS refuses to spawn the thread.
pub fn spawn_gc(
    provider: Arc<dyn SessionProvider>,
    interval: Duration,
) -> std::io::Result<GcHandle> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread = thread::Builder::new()
        .name("routemux-session-gc".to_string())
        .spawn(move || {
            info!(interval_ms = interval.as_millis() as u64, "Session GC started");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("Session GC tick");
                        if catch_unwind(AssertUnwindSafe(|| provider.gc())).is_err() {
                            error!("Session GC panicked; continuing");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Session GC stopped");
        })?;
    Ok(GcHandle {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}
