//! Per-request context handed to handlers.
//!
//! A [`Context`] borrows the request and the response for the duration of a
//! single dispatch and owns the variables extracted by the matched route. It is
//! never shared between requests.

use http::header::{CONTENT_TYPE, UPGRADE};
use serde::Serialize;
use serde_json::Value;

use crate::router::ParamVec;
use crate::server::{Request, Response};
use crate::view::{RenderError, Renderer};

pub struct Context<'a> {
    request: &'a Request,
    response: &'a mut Response,
    params: ParamVec,
    renderer: Option<&'a dyn Renderer>,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(request: &'a Request, response: &'a mut Response, params: ParamVec) -> Self {
        Self {
            request,
            response,
            params,
            renderer: None,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Option<&'a dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn response(&mut self) -> &mut Response {
        self.response
    }

    /// Route variables in extraction order (host variables first).
    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// A route variable by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.request.query_value(name)
    }

    /// Form field from a urlencoded body, else from the query string.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<String> {
        self.request.form_value(name)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.request.header(name)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.request.cookie(name)
    }

    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with") == Some("XMLHttpRequest")
    }

    #[must_use]
    pub fn is_websocket(&self) -> bool {
        self.header(UPGRADE.as_str())
            .map(|v| v.eq_ignore_ascii_case("websocket"))
            .unwrap_or(false)
    }

    /// First `x-forwarded-for` entry, else the peer address, else loopback.
    #[must_use]
    pub fn client_ip(&self) -> String {
        if let Some(first) = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first.to_string();
        }
        self.request
            .remote_addr()
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn redirect(&mut self, status: u16, url: &str) {
        self.response.redirect(url, status);
    }

    pub fn set_status(&mut self, status: u16) {
        self.response.set_status(status);
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        self.response.set_header(name, value)
    }

    pub fn write_str(&mut self, s: &str) {
        self.response.write_str(s);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    /// Serialize `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; nothing is written in that case.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.response.set_status(status);
        self.response
            .set_header(CONTENT_TYPE.as_str(), "application/json");
        self.response.write(&body);
        Ok(())
    }

    /// Render view `name` through the router's renderer into the body.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoRenderer`] when none is installed, or whatever the
    /// renderer reports.
    pub fn render(&mut self, name: &str, data: &Value) -> Result<(), RenderError> {
        let renderer = self.renderer.ok_or(RenderError::NoRenderer)?;
        let bytes = renderer.render(name, data)?;
        if self.response.header(CONTENT_TYPE.as_str()).is_none() {
            self.response
                .set_header(CONTENT_TYPE.as_str(), "text/html; charset=utf-8");
        }
        self.response.write(&bytes);
        Ok(())
    }
}
