//! Faults inside matchers, services and handlers degrade to a 500

use http::Method;
use routemux::dispatcher::Databus;
use routemux::{Context, Controller, Request, Router};

#[derive(Default)]
struct Exploding;

impl Controller for Exploding {
    fn get(&mut self, _ctx: &mut Context<'_>) {
        panic!("controller blew up");
    }
}

fn router() -> Router {
    let mut router = Router::new();
    router.handle("/raw", |ctx: &mut Context<'_>| {
        ctx.write_str("partial output");
        panic!("handler blew up");
    });
    router.controller::<Exploding>("/controller");
    router
        .matcher_fn(|req: &Request| {
            if req.header("x-explode").is_some() {
                panic!("matcher blew up");
            }
            false
        })
        .handler(|_: &mut Context<'_>| {});
    router.add_service("broken", |_: &mut Context<'_>, _: &mut Databus| {
        panic!("service blew up");
    });
    router.context_handler_fn("/service", &["broken"], |ctx: &mut Context<'_>, _: &mut Databus| {
        ctx.write_str("unreachable");
    });
    router.handle("/ok", |ctx: &mut Context<'_>| ctx.write_str("ok"));
    router
}

fn assert_internal_error(router: &Router, req: &Request) {
    let res = router.serve(req);
    assert_eq!(res.status(), 500);
    assert_eq!(res.body(), b"500 Internal Server Error");
    assert!(res.header("x-request-id").is_some());
}

#[test]
fn test_panics_become_500_and_router_keeps_serving() {
    let router = router();

    assert_internal_error(&router, &Request::new(Method::GET, "/raw"));
    assert_internal_error(&router, &Request::new(Method::GET, "/controller"));
    assert_internal_error(&router, &Request::new(Method::GET, "/service"));
    assert_internal_error(
        &router,
        &Request::new(Method::GET, "/ok").with_header("x-explode", "1"),
    );

    let res = router.serve(&Request::new(Method::GET, "/ok"));
    assert_eq!(res.status(), 200);
    assert_eq!(res.body(), b"ok");
}

#[test]
fn test_panics_from_many_threads() {
    let router = std::sync::Arc::new(router());
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let router = std::sync::Arc::clone(&router);
            std::thread::spawn(move || {
                let path = if i % 2 == 0 { "/raw" } else { "/ok" };
                router.serve(&Request::new(Method::GET, path)).status()
            })
        })
        .collect();
    let statuses: Vec<u16> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(statuses, vec![500, 200, 500, 200]);
}
