use std::borrow::Cow;
use std::net::SocketAddr;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, HOST};
use http::{HeaderMap, Method};
use tracing::debug;

/// The request boundary the router works against.
///
/// The transport adapter ([`super::AppService`]) builds one of these from the wire
/// request; tests build them directly:
///
/// ```rust
/// use http::Method;
/// use routemux::server::Request;
///
/// let req = Request::new(Method::GET, "/users/42?page=2")
///     .with_host("api.example.com:8080")
///     .with_header("accept", "application/json");
/// assert_eq!(req.path(), "/users/42");
/// assert_eq!(req.query_value("page").as_deref(), Some("2"));
/// assert_eq!(req.host_without_port(), "api.example.com");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    host: Option<String>,
    headers: HeaderMap,
    tls: bool,
    remote_addr: Option<SocketAddr>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request for `target`, a path with an optional `?query`.
    ///
    /// An empty path is normalised to `/`.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (target, None),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_string(),
            query,
            host: None,
            headers: HeaderMap::new(),
            tls: false,
            remote_addr: None,
            body: Vec::new(),
        }
    }

    /// Set the request host (authority, port allowed).
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Append a header. Invalid names or values are dropped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.append_header(name, value);
        self
    }

    /// Mark the request as received over TLS.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header in place. Returns `false` if the name or value is invalid.
    pub fn append_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
                true
            }
            _ => {
                debug!(header = %name, "Dropping invalid request header");
                false
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path component without the query string.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string without the leading `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path plus `?query` when there is one.
    #[must_use]
    pub fn request_uri(&self) -> Cow<'_, str> {
        match &self.query {
            Some(q) if !q.is_empty() => Cow::Owned(format!("{}?{}", self.path, q)),
            _ => Cow::Borrowed(&self.path),
        }
    }

    /// The request host as received, falling back to the `Host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        if let Some(h) = &self.host {
            return h;
        }
        self.headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// The request host with any `:port` suffix removed.
    #[must_use]
    pub fn host_without_port(&self) -> &str {
        strip_port(self.host())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8. Names are case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a header.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decoded query parameters in order.
    pub fn query_pairs(&self) -> impl Iterator<Item = (Cow<'_, str>, Cow<'_, str>)> {
        url::form_urlencoded::parse(self.query.as_deref().unwrap_or("").as_bytes())
    }

    /// First decoded value of query parameter `name` (case-sensitive).
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Whether the body is an `application/x-www-form-urlencoded` form.
    #[must_use]
    pub fn has_form_body(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            })
            .unwrap_or(false)
    }

    /// Form value from the urlencoded body, falling back to the query string.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<String> {
        if self.has_form_body() {
            let found = url::form_urlencoded::parse(&self.body)
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned());
            if found.is_some() {
                return found;
            }
        }
        self.query_value(name)
    }

    /// Value of cookie `name` from the `Cookie` header(s).
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.header_values(COOKIE.as_str())
            .flat_map(|c| c.split(';'))
            .find_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let key = parts.next()?.trim();
                (key == name).then(|| parts.next().unwrap_or("").trim().to_string())
            })
    }
}

/// Remove a trailing `:port` from a host, keeping bracketed IPv6 literals intact.
pub(crate) fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((h, port)) if port.bytes().all(|b| b.is_ascii_digit()) => h,
        _ => host,
    }
}
