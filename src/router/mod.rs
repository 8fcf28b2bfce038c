//! # Router Module
//!
//! Route registration, first-match lookup, redirect policy and dispatch.
//!
//! ## Overview
//!
//! A [`Router`] holds an ordered list of [`Route`]s. For each request it:
//!
//! 1. runs the registered filters; the first one returning `false` ends the request
//! 2. finds the first route whose matchers all succeed (see [`Router::find_match`])
//! 3. applies the route's scheme policy, then its trailing-slash policy; either can
//!    answer with a redirect instead of dispatching
//! 4. invokes the route's handler (raw, controller or context handler)
//! 5. falls back to the not-found handler when nothing matched
//!
//! Matching is first-match, not best-match: `/users/new` must be registered before
//! `/users/{id}` or it will never be reached.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routemux::context::Context;
//! use routemux::router::{Router, SlashPolicy};
//! use routemux::server::Request;
//!
//! let mut router = Router::new();
//! router
//!     .path("/articles/{category}/{id:[0-9]+}")
//!     .methods(&["GET"])
//!     .name("article")
//!     .handler(|ctx: &mut Context<'_>| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.write_str(&id);
//!     });
//! router
//!     .path("/docs/")
//!     .slash_policy(SlashPolicy::RedirectToCanonical)
//!     .handler(|ctx: &mut Context<'_>| ctx.write_str("docs"));
//!
//! let res = router.serve(&Request::new(Method::GET, "/articles/tech/42"));
//! assert_eq!(res.body(), b"42");
//!
//! let res = router.serve(&Request::new(Method::GET, "/docs"));
//! assert_eq!(res.status(), 307);
//! assert_eq!(res.header("location"), Some("/docs/"));
//!
//! let url = router.url("article", &["category", "tech", "id", "42"]).unwrap();
//! assert_eq!(url.to_string(), "/articles/tech/42");
//! ```
//!
//! ## Registration errors
//!
//! Builder calls never fail. The first problem a route hits (bad template,
//! duplicate variable, odd pair list, ...) is stored on it, logged at `error`, and
//! the route never matches. Check [`Router::errors`] at startup to fail fast.

mod core;
mod redirect;
mod route;

pub use core::{Filter, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use redirect::{
    decide as decide_redirect, Redirect, RedirectReason, SLASH_REDIRECT_STATUS,
};
pub use route::{BuiltUrl, Route, SchemeConstraint, SlashPolicy};
