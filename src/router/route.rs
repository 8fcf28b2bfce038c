use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::core::ParamVec;
use crate::context::Context;
use crate::dispatcher::{
    ContextHandler, Controller, Databus, Handler, HandlerKind, LifecycleOptions,
};
use crate::error::{pairs_from_flat, RouteError};
use crate::matcher::{HeaderMatcher, Matcher, MethodMatcher, QueryMatcher, RequestMatcher};
use crate::server::Request;
use crate::template::RouteTemplate;

/// Which connection type a route may be served over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeConstraint {
    #[default]
    Any,
    Http,
    Https,
}

impl FromStr for SchemeConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "any" => Ok(Self::Any),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("unknown scheme: {other}")),
        }
    }
}

/// How a route treats a trailing `/` that differs from its path template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashPolicy {
    /// Match both forms, never redirect.
    #[default]
    Fuzzy,
    /// Match both forms, then redirect (307) to the template's form.
    RedirectToCanonical,
    /// Match only the template's form.
    ExactMatch,
}

impl SlashPolicy {
    fn loose(self) -> bool {
        !matches!(self, SlashPolicy::ExactMatch)
    }
}

impl FromStr for SlashPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fuzzy" => Ok(Self::Fuzzy),
            "redirect" | "redirect_to_canonical" => Ok(Self::RedirectToCanonical),
            "exact" | "exact_match" => Ok(Self::ExactMatch),
            other => Err(format!("unknown slash policy: {other}")),
        }
    }
}

/// A URL produced by reverse routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltUrl {
    pub scheme: Option<&'static str>,
    pub host: Option<String>,
    pub path: String,
}

impl fmt::Display for BuiltUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{}://{}", self.scheme.unwrap_or("http"), host)?;
        }
        f.write_str(&self.path)
    }
}

/// One registered routing rule.
///
/// Routes are configured through chained `&mut self` calls right after
/// [`crate::router::Router::new_route`] (or one of the router shortcuts). Problems
/// found while configuring are stored rather than returned: the first one is kept
/// in [`Route::error`], and a route with an error never matches.
pub struct Route {
    name: Option<String>,
    matchers: Vec<Matcher>,
    host: Option<Arc<RouteTemplate>>,
    path: Option<Arc<RouteTemplate>>,
    methods: Vec<Method>,
    scheme: SchemeConstraint,
    slash_policy: SlashPolicy,
    handler: Option<HandlerKind>,
    lifecycle: LifecycleOptions,
    build_only: bool,
    error: Option<RouteError>,
}

impl Route {
    pub(crate) fn new(slash_policy: SlashPolicy) -> Self {
        Self {
            name: None,
            matchers: Vec::new(),
            host: None,
            path: None,
            methods: Vec::new(),
            scheme: SchemeConstraint::Any,
            slash_policy,
            handler: None,
            lifecycle: LifecycleOptions::default(),
            build_only: false,
            error: None,
        }
    }

    fn fail(&mut self, err: RouteError) -> &mut Self {
        if self.error.is_none() {
            error!(
                route = %self.describe_template(),
                error = %err,
                "Route registration error"
            );
            self.error = Some(err);
        }
        self
    }

    fn compile_path(&self, template: &str, prefix: bool) -> Result<RouteTemplate, RouteError> {
        let tpl = RouteTemplate::compile(template, false, prefix, self.slash_policy.loose())?;
        if let Some(host) = &self.host {
            tpl.ensure_disjoint(host)?;
        }
        Ok(tpl)
    }

    fn add_path(&mut self, template: &str, prefix: bool) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let full = match &self.path {
            Some(existing) => {
                let base = existing.template().trim_end_matches('/');
                format!("{base}{template}")
            }
            None => template.to_string(),
        };
        match self.compile_path(&full, prefix) {
            Ok(tpl) => {
                let tpl = Arc::new(tpl);
                self.matchers.push(Matcher::Template(Arc::clone(&tpl)));
                self.path = Some(tpl);
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Match the request path against `template`.
    ///
    /// A second call (or a call after [`path_prefix`](Self::path_prefix)) appends to
    /// the existing path template.
    pub fn path(&mut self, template: &str) -> &mut Self {
        self.add_path(template, false)
    }

    /// Match request paths starting with `template`. Switches the route to
    /// [`SlashPolicy::ExactMatch`].
    pub fn path_prefix(&mut self, template: &str) -> &mut Self {
        self.slash_policy = SlashPolicy::ExactMatch;
        self.add_path(template, true)
    }

    /// Match the request host (port ignored) against `template`.
    pub fn host(&mut self, template: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let compiled = RouteTemplate::compile(template, true, false, false).and_then(|tpl| {
            if let Some(path) = &self.path {
                tpl.ensure_disjoint(path)?;
            }
            Ok(tpl)
        });
        match compiled {
            Ok(tpl) => {
                let tpl = Arc::new(tpl);
                self.matchers.push(Matcher::Template(Arc::clone(&tpl)));
                self.host = Some(tpl);
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Restrict the route to these methods (case-insensitive).
    pub fn methods(&mut self, methods: &[&str]) -> &mut Self {
        match MethodMatcher::new(methods) {
            Ok(matcher) => {
                self.methods.extend(matcher.methods().iter().cloned());
                self.matchers.push(Matcher::Predicate(Arc::new(matcher)));
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Require headers, given as `name, value, ...`. An empty value only
    /// requires presence.
    pub fn headers(&mut self, pairs: &[&str]) -> &mut Self {
        match HeaderMatcher::from_pairs(pairs) {
            Ok(m) => {
                self.matchers.push(Matcher::Predicate(Arc::new(m)));
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Require query parameters, given as `key, value, ...`.
    pub fn queries(&mut self, pairs: &[&str]) -> &mut Self {
        match QueryMatcher::from_pairs(pairs) {
            Ok(m) => {
                self.matchers.push(Matcher::Predicate(Arc::new(m)));
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Add a custom predicate.
    pub fn matcher_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.matcher(Arc::new(f))
    }

    pub fn matcher(&mut self, m: Arc<dyn RequestMatcher>) -> &mut Self {
        self.matchers.push(Matcher::Predicate(m));
        self
    }

    /// Serve only over `"http"` or `"https"`, redirecting requests that
    /// arrive over the other one.
    pub fn only_scheme(&mut self, scheme: &str) -> &mut Self {
        match scheme.parse() {
            Ok(s) => self.scheme(s),
            Err(_) => self.fail(RouteError::InvalidScheme {
                scheme: scheme.to_string(),
            }),
        }
    }

    pub fn scheme(&mut self, scheme: SchemeConstraint) -> &mut Self {
        self.scheme = scheme;
        self
    }

    /// Change the trailing-slash policy. An existing non-prefix path template is
    /// recompiled so matching follows the new policy.
    pub fn slash_policy(&mut self, policy: SlashPolicy) -> &mut Self {
        self.slash_policy = policy;
        if self.error.is_some() {
            return self;
        }
        let Some(old) = self.path.clone() else {
            return self;
        };
        if old.is_prefix() || old.is_loose_trailing_slash() == policy.loose() {
            return self;
        }
        match self.compile_path(old.template(), false) {
            Ok(tpl) => {
                let tpl = Arc::new(tpl);
                for m in &mut self.matchers {
                    if let Matcher::Template(t) = m {
                        if Arc::ptr_eq(t, &old) {
                            *t = Arc::clone(&tpl);
                        }
                    }
                }
                self.path = Some(tpl);
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// Run `check_auth` on controllers for every method, not only POST/PUT/DELETE.
    pub fn check_auth(&mut self) -> &mut Self {
        self.lifecycle.check_auth = true;
        self
    }

    /// Run `check_csrf` on controllers for every method, not only POST/PUT/DELETE.
    pub fn check_csrf(&mut self) -> &mut Self {
        self.lifecycle.check_csrf = true;
        self
    }

    /// Name the route for [`crate::router::Router::get`] and `Router::url`.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Never match; keep the route only for URL building.
    pub fn build_only(&mut self) -> &mut Self {
        self.build_only = true;
        self
    }

    /// Attach the terminal handler. A second call is a registration error.
    pub fn set_handler(&mut self, kind: HandlerKind) -> &mut Self {
        if self.handler.is_some() {
            return self.fail(RouteError::HandlerAlreadySet);
        }
        debug!(route = %self.describe_template(), kind = kind.kind(), "Handler attached");
        self.handler = Some(kind);
        self
    }

    pub fn handler<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.set_handler(HandlerKind::raw(handler))
    }

    pub fn controller<C: Controller + Default + 'static>(&mut self) -> &mut Self {
        self.set_handler(HandlerKind::controller::<C>())
    }

    pub fn controller_fn<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.set_handler(HandlerKind::controller_fn(factory))
    }

    pub fn context_handler<H: ContextHandler>(&mut self) -> &mut Self {
        self.set_handler(HandlerKind::context::<H>())
    }

    pub fn context_handler_fn<F>(&mut self, dependencies: &[&'static str], f: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>, &mut Databus) + Send + Sync + 'static,
    {
        self.set_handler(HandlerKind::context_fn(dependencies, f))
    }

    /// The first registration error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RouteError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn path_template(&self) -> Option<&RouteTemplate> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn host_template(&self) -> Option<&RouteTemplate> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn get_methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn get_scheme(&self) -> SchemeConstraint {
        self.scheme
    }

    #[must_use]
    pub fn get_slash_policy(&self) -> SlashPolicy {
        self.slash_policy
    }

    #[must_use]
    pub fn handler_kind(&self) -> Option<&HandlerKind> {
        self.handler.as_ref()
    }

    #[must_use]
    pub fn lifecycle(&self) -> LifecycleOptions {
        self.lifecycle
    }

    /// Build-only routes, and routes without a handler, never match.
    #[must_use]
    pub fn is_build_only(&self) -> bool {
        self.build_only || self.handler.is_none()
    }

    /// Evaluate every matcher in order and collect variables on success.
    ///
    /// Host variables come before path variables.
    #[must_use]
    pub fn matches(&self, req: &Request) -> Option<ParamVec> {
        if self.error.is_some() || self.is_build_only() {
            return None;
        }
        let mut host_params = ParamVec::new();
        let mut path_params = ParamVec::new();
        for m in &self.matchers {
            let ok = match m {
                Matcher::Template(t) if is_same(&self.host, t) => {
                    t.extract(req.host_without_port(), &mut host_params)
                }
                Matcher::Template(t) if is_same(&self.path, t) => {
                    t.extract(req.path(), &mut path_params)
                }
                other => other.matches(req),
            };
            if !ok {
                return None;
            }
        }
        host_params.extend(path_params);
        Some(host_params)
    }

    /// Build the full URL (host and/or path) from `name, value, ...` pairs.
    ///
    /// # Errors
    ///
    /// The route's registration error, or [`RouteError::OddParameterCount`],
    /// [`RouteError::MissingVariable`], [`RouteError::VariableMismatch`],
    /// [`RouteError::NoTemplate`].
    pub fn url(&self, pairs: &[&str]) -> Result<BuiltUrl, RouteError> {
        let values = self.url_values(pairs)?;
        if self.host.is_none() && self.path.is_none() {
            return Err(RouteError::NoTemplate {
                component: "host or path",
            });
        }
        let mut url = BuiltUrl {
            scheme: None,
            host: None,
            path: String::new(),
        };
        if let Some(host) = &self.host {
            url.host = Some(host.build(&values)?);
            url.scheme = Some(self.url_scheme());
        }
        if let Some(path) = &self.path {
            url.path = path.build(&values)?;
        }
        Ok(url)
    }

    /// Build only the scheme and host part.
    ///
    /// # Errors
    ///
    /// As [`Route::url`]; [`RouteError::NoTemplate`] without a host template.
    pub fn url_host(&self, pairs: &[&str]) -> Result<BuiltUrl, RouteError> {
        let values = self.url_values(pairs)?;
        let host = self
            .host
            .as_ref()
            .ok_or(RouteError::NoTemplate { component: "host" })?;
        Ok(BuiltUrl {
            scheme: Some(self.url_scheme()),
            host: Some(host.build(&values)?),
            path: String::new(),
        })
    }

    /// Build only the path part.
    ///
    /// # Errors
    ///
    /// As [`Route::url`]; [`RouteError::NoTemplate`] without a path template.
    pub fn url_path(&self, pairs: &[&str]) -> Result<BuiltUrl, RouteError> {
        let values = self.url_values(pairs)?;
        let path = self
            .path
            .as_ref()
            .ok_or(RouteError::NoTemplate { component: "path" })?;
        Ok(BuiltUrl {
            scheme: None,
            host: None,
            path: path.build(&values)?,
        })
    }

    fn url_values<'a>(&self, pairs: &[&'a str]) -> Result<HashMap<&'a str, &'a str>, RouteError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(pairs_from_flat(pairs)?.into_iter().collect())
    }

    fn url_scheme(&self) -> &'static str {
        match self.scheme {
            SchemeConstraint::Https => "https",
            _ => "http",
        }
    }

    pub(crate) fn describe_template(&self) -> String {
        let host = self.host.as_ref().map(|h| h.template()).unwrap_or("");
        let path = self.path.as_ref().map(|p| p.template()).unwrap_or("");
        match (host.is_empty(), path.is_empty()) {
            (true, true) => "<no template>".to_string(),
            _ => format!("{host}{path}"),
        }
    }
}

fn is_same(slot: &Option<Arc<RouteTemplate>>, t: &Arc<RouteTemplate>) -> bool {
    slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, t))
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("template", &self.describe_template())
            .field("methods", &self.methods)
            .field("scheme", &self.scheme)
            .field("slash_policy", &self.slash_policy)
            .field("handler", &self.handler)
            .field("error", &self.error)
            .finish()
    }
}
