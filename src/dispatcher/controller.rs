use std::fmt;

use http::Method;
use tracing::{debug, info};

use crate::context::Context;
use crate::server::Request;

/// Form field that lets a POST stand in for PUT or DELETE.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// A stateful request handler with a fixed lifecycle.
///
/// One instance is created per request by the route's factory and dropped when
/// the request completes. Every hook has a default, so a controller only
/// overrides what it serves; method hooks left alone answer `405`.
///
/// Lifecycle, in order:
///
/// 1. [`init`](Self::init)
/// 2. [`prepare`](Self::prepare)
/// 3. [`check_auth`](Self::check_auth) for POST/PUT/DELETE, or any method when the
///    route opted in with `check_auth()`. Returning `false` stops here.
/// 4. [`check_csrf`](Self::check_csrf), gated the same way
/// 5. exactly one method hook
/// 6. [`finish`](Self::finish)
///
/// A rejecting check is expected to write its own response.
#[allow(unused_variables)]
pub trait Controller: Send {
    fn init(&mut self, ctx: &mut Context<'_>) {}
    fn prepare(&mut self, ctx: &mut Context<'_>) {}
    fn check_auth(&mut self, ctx: &mut Context<'_>) -> bool {
        true
    }
    fn check_csrf(&mut self, ctx: &mut Context<'_>) -> bool {
        true
    }

    fn get(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn post(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn put(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn delete(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn head(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn patch(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }
    fn options(&mut self, ctx: &mut Context<'_>) {
        method_not_allowed(ctx);
    }

    fn finish(&mut self, ctx: &mut Context<'_>) {}
}

/// Default body of an unimplemented method hook.
pub fn method_not_allowed(ctx: &mut Context<'_>) {
    ctx.set_status(405);
    ctx.set_header("content-type", "text/plain; charset=utf-8");
    ctx.write_str("Method Not Allowed");
}

/// The method hook a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl ControllerMethod {
    /// Pick the hook for `req`, honouring `_method=put|delete` on POST.
    ///
    /// Returns `None` for methods no hook serves.
    #[must_use]
    pub fn resolve(req: &Request) -> Option<Self> {
        let method = req.method();
        if method == Method::HEAD {
            return Some(Self::Head);
        }
        let overridden = if method == Method::POST {
            req.form_value(METHOD_OVERRIDE_FIELD)
        } else {
            None
        };
        let is_override = |target: &str| {
            overridden
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(target))
        };

        if method == Method::DELETE || is_override("delete") {
            Some(Self::Delete)
        } else if method == Method::PUT || is_override("put") {
            Some(Self::Put)
        } else if method == Method::POST {
            Some(Self::Post)
        } else if method == Method::PATCH {
            Some(Self::Patch)
        } else if method == Method::OPTIONS {
            Some(Self::Options)
        } else if method == Method::GET {
            Some(Self::Get)
        } else {
            None
        }
    }

    /// POST, PUT and DELETE always go through the auth and CSRF checks.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Delete)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }

    fn call(self, c: &mut dyn Controller, ctx: &mut Context<'_>) {
        match self {
            Self::Get => c.get(ctx),
            Self::Post => c.post(ctx),
            Self::Put => c.put(ctx),
            Self::Delete => c.delete(ctx),
            Self::Head => c.head(ctx),
            Self::Patch => c.patch(ctx),
            Self::Options => c.options(ctx),
        }
    }
}

impl fmt::Display for ControllerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route-level opt-ins for the checks on non-mutating methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub check_auth: bool,
    pub check_csrf: bool,
}

/// How far a controller lifecycle got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The method hook and `finish` ran.
    Completed(ControllerMethod),
    AuthRejected,
    CsrfRejected,
    /// No hook serves the request method; answered 405 without running the lifecycle.
    UnsupportedMethod,
}

/// Drive `controller` through its lifecycle for the request in `ctx`.
pub fn run_lifecycle(
    controller: &mut dyn Controller,
    ctx: &mut Context<'_>,
    opts: LifecycleOptions,
) -> LifecycleOutcome {
    let Some(method) = ControllerMethod::resolve(ctx.request()) else {
        info!(method = %ctx.request().method(), "Controller has no hook for method");
        method_not_allowed(ctx);
        return LifecycleOutcome::UnsupportedMethod;
    };

    controller.init(ctx);
    controller.prepare(ctx);

    if (method.is_mutating() || opts.check_auth) && !controller.check_auth(ctx) {
        info!(method = %method, "Controller rejected request in check_auth");
        return LifecycleOutcome::AuthRejected;
    }
    if (method.is_mutating() || opts.check_csrf) && !controller.check_csrf(ctx) {
        info!(method = %method, "Controller rejected request in check_csrf");
        return LifecycleOutcome::CsrfRejected;
    }

    debug!(method = %method, "Invoking controller method");
    method.call(controller, ctx);
    controller.finish(ctx);
    LifecycleOutcome::Completed(method)
}
