use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use may::coroutine::JoinHandle;
use may_minihttp::HttpServerWithHeaders;
use tracing::{info, warn};

use super::service::AppService;
use crate::router::Router;

/// Serves an [`AppService`] with `may_minihttp`.
///
/// Accepts up to 32 request headers, enough for traffic that passed through a
/// gateway or two.
pub struct HttpServer(AppService);

impl HttpServer {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self(AppService::new(router))
    }

    #[must_use]
    pub fn from_service(service: AppService) -> Self {
        Self(service)
    }

    /// Bind `addr` and start accepting connections.
    ///
    /// # Errors
    ///
    /// Address resolution or bind failures.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let routes = self.0.router().routes().len();
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        info!(addr = %addr, routes = routes, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}

/// A running server.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listener until it accepts a connection or `timeout` passes.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the listener never answered.
    pub fn wait_ready(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"));
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Cancel the accept coroutine and wait for it to exit.
    pub fn stop(self) {
        // SAFETY: cancelling is how may shuts a listener coroutine down; the handle
        // is still owned here, so the coroutine it refers to is alive.
        unsafe {
            self.handle.coroutine().cancel();
        }
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "Server coroutine ended with a panic");
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until the server coroutine exits.
    ///
    /// # Errors
    ///
    /// The coroutine's panic payload if it panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}
