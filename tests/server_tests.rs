//! End-to-end tests over a real `may_minihttp` listener
//!
//! # Test Strategy
//!
//! Each test starts its own server on a free port through an RAII fixture that
//! stops the listener on drop, then talks raw HTTP/1.1 to it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use routemux::server::{AppService, HttpServer, ServerHandle};
use routemux::{Context, Controller, Router, RouterConfig};

mod common;
use common::http::send_request;
use common::test_server::{free_addr, setup_may_runtime};

#[derive(Default)]
struct Items;

impl Controller for Items {
    fn get(&mut self, ctx: &mut Context<'_>) {
        let id = ctx.param("id").unwrap_or_default().to_string();
        ctx.write_str(&format!("item {id}"));
    }

    fn put(&mut self, ctx: &mut Context<'_>) {
        let name = ctx.form_value("name").unwrap_or_default();
        ctx.write_str(&format!("renamed to {name}"));
    }
}

struct TestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl TestServer {
    fn start(config: RouterConfig, tls: bool) -> Self {
        setup_may_runtime();
        let mut router = Router::with_config(config);
        router.controller::<Items>("/items/{id:[0-9]+}");
        router
            .handle("/secure", |ctx: &mut Context<'_>| ctx.write_str("secret"))
            .only_scheme("https");
        router.handle("/echo-host", |ctx: &mut Context<'_>| {
            let host = ctx.request().host().to_string();
            ctx.write_str(&host);
        });

        let service = AppService::new(Arc::new(router)).with_tls(tls);
        let addr = free_addr();
        let handle = HttpServer::from_service(service).start(addr).unwrap();
        handle.wait_ready(Duration::from_secs(5)).unwrap();
        Self {
            handle: Some(handle),
            addr,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

#[test]
fn test_get_over_the_wire() {
    let server = TestServer::start(RouterConfig::default(), false);
    let res = send_request(
        server.addr,
        "GET /items/7 HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "item 7");
    assert!(res.header("x-request-id").is_some());

    let res = send_request(
        server.addr,
        "GET /items/seven HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(res.status, 404);
}

#[test]
fn test_form_body_method_override() {
    let server = TestServer::start(RouterConfig::default(), false);
    let body = "_method=PUT&name=gizmo";
    let raw = format!(
        "POST /items/3 HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let res = send_request(server.addr, &raw);
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "renamed to gizmo");
}

#[test]
fn test_scheme_redirect_over_the_wire() {
    let server = TestServer::start(RouterConfig::default(), false);
    let res = send_request(
        server.addr,
        "GET /secure?x=1 HTTP/1.1\r\nHost: shop.example.com\r\n\r\n",
    );
    assert_eq!(res.status, 303);
    assert_eq!(res.header("location"), Some("https://shop.example.com/secure?x=1"));
}

#[test]
fn test_forwarded_proto_only_when_trusted() {
    let raw = "GET /secure HTTP/1.1\r\nHost: shop.example.com\r\nX-Forwarded-Proto: https\r\n\r\n";

    let untrusted = TestServer::start(RouterConfig::default(), false);
    assert_eq!(send_request(untrusted.addr, raw).status, 303);

    let config = RouterConfig {
        trust_forwarded_proto: true,
        ..RouterConfig::default()
    };
    let trusted = TestServer::start(config, false);
    let res = send_request(trusted.addr, raw);
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "secret");
}

#[test]
fn test_tls_listener() {
    let server = TestServer::start(RouterConfig::default(), true);
    let res = send_request(
        server.addr,
        "GET /secure HTTP/1.1\r\nHost: shop.example.com\r\n\r\n",
    );
    assert_eq!(res.status, 200);
}

#[test]
fn test_host_header_reaches_handlers() {
    let server = TestServer::start(RouterConfig::default(), false);
    let res = send_request(
        server.addr,
        "GET /echo-host HTTP/1.1\r\nHost: api.example.com:8080\r\n\r\n",
    );
    assert_eq!(res.body, "api.example.com:8080");
}
