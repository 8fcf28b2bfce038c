use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, error, info, info_span, warn};

use super::redirect;
use super::route::{BuiltUrl, Route};
use crate::config::RouterConfig;
use crate::context::Context;
use crate::dispatcher::{
    ContextHandler, Controller, Databus, DatabusService, Handler, LifecycleOptions,
    ServiceRegistry,
};
use crate::error::RouteError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::server::{Request, Response};
use crate::view::Renderer;

/// Maximum number of route variables kept inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted route variables, host variables first.
///
/// Names are shared with the compiled template, so collecting them is a
/// reference-count bump rather than a string copy.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The route chosen for a request and its variables.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: ParamVec,
}

impl RouteMatch<'_> {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Pre-routing gate. Returning `false` ends the request with whatever the
/// filter wrote to the response.
pub trait Filter: Send + Sync {
    fn filter(&self, req: &Request, res: &mut Response) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Request, &mut Response) -> bool + Send + Sync,
{
    fn filter(&self, req: &Request, res: &mut Response) -> bool {
        self(req, res)
    }
}

/// Ordered, first-match request router.
///
/// Routes are tried in registration order and the first one whose matchers all
/// succeed wins; register specific routes before general ones. The router is
/// configured up front and then only read, so a shared `Arc<Router>` can serve
/// any number of concurrent requests.
pub struct Router {
    routes: Vec<Route>,
    filters: Vec<Arc<dyn Filter>>,
    not_found: Arc<dyn Handler>,
    services: ServiceRegistry,
    renderer: Option<Arc<dyn Renderer>>,
    config: RouterConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn default_not_found(ctx: &mut Context<'_>) {
    ctx.set_status(404);
    ctx.set_header("content-type", "text/plain; charset=utf-8");
    ctx.write_str("404 page not found");
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            filters: Vec::new(),
            not_found: Arc::new(default_not_found),
            services: ServiceRegistry::new(),
            renderer: None,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Append an empty route and return it for configuration.
    pub fn new_route(&mut self) -> &mut Route {
        self.routes
            .push(Route::new(self.config.default_slash_policy));
        let idx = self.routes.len() - 1;
        &mut self.routes[idx]
    }

    pub fn path(&mut self, template: &str) -> &mut Route {
        self.new_route().path(template)
    }

    pub fn path_prefix(&mut self, template: &str) -> &mut Route {
        self.new_route().path_prefix(template)
    }

    pub fn host(&mut self, template: &str) -> &mut Route {
        self.new_route().host(template)
    }

    pub fn methods(&mut self, methods: &[&str]) -> &mut Route {
        self.new_route().methods(methods)
    }

    pub fn headers(&mut self, pairs: &[&str]) -> &mut Route {
        self.new_route().headers(pairs)
    }

    pub fn queries(&mut self, pairs: &[&str]) -> &mut Route {
        self.new_route().queries(pairs)
    }

    pub fn matcher_fn<F>(&mut self, f: F) -> &mut Route
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.new_route().matcher_fn(f)
    }

    /// Route `template` to a raw handler.
    pub fn handle<H: Handler + 'static>(&mut self, template: &str, handler: H) -> &mut Route {
        self.path(template).handler(handler)
    }

    /// Route `template` to a controller built with `C::default()`.
    pub fn controller<C: Controller + Default + 'static>(&mut self, template: &str) -> &mut Route {
        self.path(template).controller::<C>()
    }

    pub fn controller_fn<C, F>(&mut self, template: &str, factory: F) -> &mut Route
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.path(template).controller_fn(factory)
    }

    pub fn context_handler<H: ContextHandler>(&mut self, template: &str) -> &mut Route {
        self.path(template).context_handler::<H>()
    }

    pub fn context_handler_fn<F>(
        &mut self,
        template: &str,
        dependencies: &[&'static str],
        f: F,
    ) -> &mut Route
    where
        F: Fn(&mut Context<'_>, &mut Databus) + Send + Sync + 'static,
    {
        self.path(template).context_handler_fn(dependencies, f)
    }

    /// Add a pre-routing filter. Filters run in registration order.
    pub fn filter<F: Filter + 'static>(&mut self, f: F) -> &mut Self {
        self.filters.push(Arc::new(f));
        self
    }

    /// Replace the handler for requests no route matches.
    pub fn not_found<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.not_found = Arc::new(handler);
        self
    }

    /// Register the service that fills databus field `name`.
    pub fn add_service<S: DatabusService + 'static>(&mut self, name: &str, service: S) -> &mut Self {
        self.services.add(name, Arc::new(service));
        self
    }

    pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.get_name() == Some(name))
    }

    /// Build the URL of a named route.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownRoute`] or whatever [`Route::url`] reports.
    pub fn url(&self, name: &str, pairs: &[&str]) -> Result<BuiltUrl, RouteError> {
        self.get(name)
            .ok_or_else(|| RouteError::UnknownRoute {
                name: name.to_string(),
            })?
            .url(pairs)
    }

    /// Registration errors by route index.
    #[must_use]
    pub fn errors(&self) -> Vec<(usize, &RouteError)> {
        self.routes
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.error().map(|e| (i, e)))
            .collect()
    }

    /// Log the routing table at `info`.
    pub fn dump_routes(&self) {
        for (i, r) in self.routes.iter().enumerate() {
            info!(
                index = i,
                name = r.get_name().unwrap_or(""),
                template = %r.describe_template(),
                methods = ?r.get_methods(),
                scheme = ?r.get_scheme(),
                slash_policy = ?r.get_slash_policy(),
                handler = r.handler_kind().map(|h| h.kind()).unwrap_or("build-only"),
                error = r.error().map(|e| e.to_string()).unwrap_or_default(),
                "Route"
            );
        }
        info!(
            routes = self.routes.len(),
            filters = self.filters.len(),
            services = self.services.len(),
            "Routing table"
        );
    }

    /// First route matching `req`, with its variables.
    #[must_use]
    pub fn find_match(&self, req: &Request) -> Option<RouteMatch<'_>> {
        debug!(method = %req.method(), path = %req.path(), host = %req.host(), "Matching request");
        self.routes.iter().find_map(|route| {
            route
                .matches(req)
                .map(|params| RouteMatch { route, params })
        })
    }

    /// Serve one request: filters, matching, redirect policy, then dispatch.
    ///
    /// Panics raised anywhere inside are caught and turned into a `500`.
    #[must_use]
    pub fn serve(&self, req: &Request) -> Response {
        let request_id = RequestId::for_request(req);
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path()
        );
        let _guard = span.enter();

        let mut res = Response::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(req, &mut res)));
        if let Err(panic) = outcome {
            let backtrace = Backtrace::force_capture();
            error!(
                panic_message = %panic_message(panic.as_ref()),
                backtrace = %backtrace,
                "Request handling panicked"
            );
            res = Response::text(500, "500 Internal Server Error");
        }
        res.set_header(REQUEST_ID_HEADER, &request_id.to_string());
        res
    }

    fn dispatch(&self, req: &Request, res: &mut Response) {
        for f in &self.filters {
            if !f.filter(req, res) {
                info!(status = res.status(), "Request stopped by filter");
                return;
            }
        }

        let Some(RouteMatch { route, params }) = self.find_match(req) else {
            warn!("No route matched");
            let mut ctx = self.context(req, res, ParamVec::new());
            self.not_found.serve(&mut ctx);
            return;
        };

        if let Some(r) = redirect::decide(route, req, &self.config) {
            info!(
                location = %r.location,
                status = r.status,
                reason = ?r.reason,
                "Redirecting"
            );
            res.redirect(&r.location, r.status);
            return;
        }

        info!(
            route = %route.describe_template(),
            name = route.get_name().unwrap_or(""),
            params = ?params,
            "Route matched"
        );
        let opts: LifecycleOptions = route.lifecycle();
        let mut ctx = self.context(req, res, params);
        if let Some(handler) = route.handler_kind() {
            handler.invoke(&mut ctx, &self.services, opts);
        }
    }

    fn context<'a>(&'a self, req: &'a Request, res: &'a mut Response, params: ParamVec) -> Context<'a> {
        Context::new(req, res, params).with_renderer(self.renderer.as_deref())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
