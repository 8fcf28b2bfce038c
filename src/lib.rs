//! # routemux
//!
//! **routemux** is an ordered, first-match HTTP request router for the `may`
//! coroutine runtime.
//!
//! ## Overview
//!
//! Routes are declared in order on a [`Router`]. Each route combines any number of
//! matchers (path, host, methods, headers, query values, arbitrary predicates);
//! the first route whose matchers all agree wins. Path and host templates use
//! `{name}` and `{name:pattern}` placeholders which are compiled to regular
//! expressions once, at registration, and reversed later to build URLs.
//!
//! Matched requests are handed to one of three handler styles:
//!
//! - a raw [`Handler`](dispatcher::Handler) closure,
//! - a [`Controller`] with a per-request instance and lifecycle hooks
//!   (`init`, `prepare`, auth and CSRF checks, the method hook, `finish`),
//! - a [`ContextHandler`] whose declared dependencies are filled from a
//!   per-request databus by registered services.
//!
//! ## Architecture
//!
//! - **[`template`]** - Template compilation, matching, extraction and reversal
//! - **[`matcher`]** - Method, header, query and predicate matchers
//! - **[`router`]** - Route declaration, first-match lookup, redirects, URL building
//! - **[`dispatcher`]** - Controller lifecycle, databus and service registry
//! - **[`context`]** - Per-request handler context
//! - **[`server`]** - Request/response types and the `may_minihttp` adapter
//! - **[`config`]** - Router configuration from YAML and environment
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`session`]** - Session provider contract and background GC
//! - **[`view`]** - Template renderer contract
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use routemux::{Context, Request, Router};
//!
//! let mut router = Router::new();
//! router
//!     .handle("/articles/{category}/{id:[0-9]+}", |ctx: &mut Context<'_>| {
//!         let body = format!("{} #{}", ctx.param("category").unwrap_or(""), ctx.param("id").unwrap_or(""));
//!         ctx.write_str(&body);
//!     })
//!     .name("article");
//!
//! let res = router.serve(&Request::new(Method::GET, "/articles/tech/42"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body(), b"tech #42");
//!
//! let url = router.url("article", &["category", "tech", "id", "42"]).unwrap();
//! assert_eq!(url.path, "/articles/tech/42");
//! ```
//!
//! ## Serving
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use routemux::server::HttpServer;
//!
//! let handle = HttpServer::new(Arc::new(router)).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod matcher;
pub mod router;
pub mod server;
pub mod session;
pub mod template;
pub mod view;

pub use config::RouterConfig;
pub use context::Context;
pub use dispatcher::{Controller, ContextHandler, Databus};
pub use error::RouteError;
pub use router::{Route, Router};
pub use server::{Request, Response};
