use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, StatusCode};
use tracing::debug;

/// The response boundary handlers write into.
///
/// Starts as `200` with no headers and an empty body. The transport adapter copies
/// it onto the wire after dispatch.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }

    /// A `text/plain` response with the given status and body.
    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        let mut res = Self::new();
        res.set_status(status);
        res.set_header(CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        res.write_str(body);
        res
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
        self.written = true;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set (replace) a header. Returns `false` if the name or value is invalid.
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
                self.written = true;
                true
            }
            _ => {
                debug!(header = %name, "Refusing invalid response header");
                false
            }
        }
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
        self.written = true;
    }

    pub fn write_str(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    /// Respond with a redirect to `url`.
    pub fn redirect(&mut self, url: &str, status: u16) {
        self.set_status(status);
        if !self.set_header(LOCATION.as_str(), url) {
            debug!(location = %url, "Redirect target is not a valid header value");
        }
    }

    /// Whether anything (status, header or body) has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Canonical reason phrase for the current status.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    #[must_use]
    pub fn into_parts(self) -> (u16, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}
