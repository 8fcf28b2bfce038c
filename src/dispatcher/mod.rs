//! # Dispatcher Module
//!
//! Handler adapters. Once a route has matched, its [`HandlerKind`] decides how the
//! request is served:
//!
//! - **Raw** - a [`Handler`] (any `Fn(&mut Context)` works) called directly
//! - **Controller** - a fresh [`Controller`] per request, driven through
//!   `init → prepare → check_auth → check_csrf → <method> → finish`
//! - **Context** - a fresh [`ContextHandler`] per request, built from a
//!   [`Databus`] that the router's named services fill first
//!
//! ## Controller method selection
//!
//! | Request | Hook |
//! |---|---|
//! | `HEAD` | `head` |
//! | `DELETE`, or `POST` with `_method=delete` | `delete` |
//! | `PUT`, or `POST` with `_method=put` | `put` |
//! | `POST` | `post` |
//! | `PATCH` | `patch` |
//! | `OPTIONS` | `options` |
//! | `GET` | `get` |
//!
//! Hooks a controller doesn't implement answer `405 Method Not Allowed`.
//!
//! ## Example
//!
//! ```rust
//! use routemux::context::Context;
//! use routemux::dispatcher::Controller;
//! use routemux::router::Router;
//!
//! #[derive(Default)]
//! struct UserController;
//!
//! impl Controller for UserController {
//!     fn get(&mut self, ctx: &mut Context<'_>) {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.write_str(&format!("user {id}"));
//!     }
//! }
//!
//! let mut router = Router::new();
//! router.controller::<UserController>("/users/{id:[0-9]+}");
//! ```

mod controller;
mod core;
mod databus;
#[cfg(test)]
mod tests;

pub use controller::{
    method_not_allowed, run_lifecycle, Controller, ControllerMethod, LifecycleOptions,
    LifecycleOutcome, METHOD_OVERRIDE_FIELD,
};
pub use core::{ControllerFactory, Handler, HandlerKind};
pub use databus::{ContextHandler, Databus, DatabusSchema, DatabusService, ServiceRegistry};
