//! # Server Module
//!
//! The request/response boundary the router works against, and the adapter that
//! serves a router over `may_minihttp`.
//!
//! [`Request`] and [`Response`] are plain data: the router never touches a
//! socket, so tests can drive it without a listener. [`AppService`] converts wire
//! requests into [`Request`]s and copies [`Response`]s back, and [`HttpServer`]
//! runs it on the `may` coroutine runtime with one coroutine per connection.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::Request;
pub use response::Response;
pub use service::AppService;
