use std::collections::HashSet;
use std::io::{self, Read};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use http::header::{HeaderName, ETAG, LAST_MODIFIED, LOCATION, SET_COOKIE};
use http::Method;
use may_minihttp::{HttpService, Request as WireRequest, Response as WireResponse};
use tracing::{debug, warn};

use super::request::Request;
use super::response::{status_reason, Response};
use crate::router::Router;

/// Adapts a [`Router`] to `may_minihttp`.
///
/// Each connection coroutine gets its own clone; the router itself is shared.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    tls: bool,
}

impl AppService {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router, tls: false }
    }

    /// Mark every request from this listener as TLS, for listeners behind a
    /// terminating proxy that always speaks https.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Build the router's request from wire parts.
    ///
    /// `x-forwarded-proto: https` only marks the request as TLS when the router
    /// config trusts it.
    pub fn build_request<'h, I>(&self, method: &str, target: &str, headers: I, body: Vec<u8>) -> Option<Request>
    where
        I: IntoIterator<Item = (&'h str, &'h [u8])>,
    {
        let method = Method::from_bytes(method.as_bytes()).ok()?;
        let mut req = Request::new(method, target);
        for (name, value) in headers {
            req.append_header(name, &String::from_utf8_lossy(value));
        }
        let forwarded_tls = self.router.config().trust_forwarded_proto
            && req
                .header("x-forwarded-proto")
                .map(|p| p.trim().eq_ignore_ascii_case("https"))
                .unwrap_or(false);
        Some(req.with_tls(self.tls || forwarded_tls).with_body(body))
    }
}

/// Copy a routed response onto the wire.
fn write_response(out: &mut WireResponse, res: Response) {
    let status = res.status();
    out.status_code(status as usize, status_reason(status));
    let (_, headers, body) = res.into_parts();
    for (name, value) in &headers {
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "Skipping non-text response header");
            continue;
        };
        out.header(header_line(name, value));
    }
    out.body_vec(body);
}

/// Upper bound on distinct interned header lines.
const MAX_INTERNED_LINES: usize = 1024;

/// Header names whose values change from request to request.
fn is_per_request(name: &HeaderName) -> bool {
    name.as_str() == "x-request-id"
        || *name == LOCATION
        || *name == SET_COOKIE
        || *name == ETAG
        || *name == LAST_MODIFIED
}

/// A `'static` header line for `may_minihttp`.
///
/// Stable lines (`content-type: application/json`, ...) are leaked once and
/// reused. Per-request lines, and anything past the intern limit, are leaked
/// on every response.
fn header_line(name: &HeaderName, value: &str) -> &'static str {
    let line = format!("{name}: {value}");
    if is_per_request(name) {
        return Box::leak(line.into_boxed_str());
    }
    static INTERNED: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    let mut interned = INTERNED
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = interned.get(line.as_str()) {
        return *existing;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    if interned.len() < MAX_INTERNED_LINES {
        interned.insert(leaked);
    }
    leaked
}

impl HttpService for AppService {
    fn call(&mut self, req: WireRequest, res: &mut WireResponse) -> io::Result<()> {
        let method = req.method().to_string();
        let target = req.path().to_string();
        let headers: Vec<(String, Vec<u8>)> = req
            .headers()
            .iter()
            .map(|h| (h.name.to_string(), h.value.to_vec()))
            .collect();
        let mut body = Vec::new();
        if let Err(e) = req.body().read_to_end(&mut body) {
            warn!(error = %e, "Failed to read request body");
        }

        let request = self.build_request(
            &method,
            &target,
            headers.iter().map(|(n, v)| (n.as_str(), v.as_slice())),
            body,
        );
        let response = match request {
            Some(r) => self.router.serve(&r),
            None => {
                warn!(method = %method, "Rejecting request with invalid method");
                Response::text(400, "400 Bad Request")
            }
        };
        write_response(res, response);
        Ok(())
    }
}
