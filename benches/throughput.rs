use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use routemux::{Context, Controller, Request, Router};

#[derive(Default)]
struct Animals;

impl Controller for Animals {
    fn get(&mut self, ctx: &mut Context<'_>) {
        ctx.write_str("animal");
    }
    fn put(&mut self, ctx: &mut Context<'_>) {
        ctx.write_str("updated");
    }
}

fn noop(_: &mut Context<'_>) {}

fn zoo_router() -> Router {
    let mut router = Router::new();
    router.handle("/", noop).methods(&["GET"]);
    router.handle("/zoo/animals", noop).methods(&["GET", "POST"]);
    router.controller::<Animals>("/zoo/animals/{id:[0-9]+}");
    router.handle("/zoo/animals/{id}/toys/{toy_id}", noop);
    router.handle(
        "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
        noop,
    );
    router
        .handle(
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
            noop,
        )
        .methods(&["POST"]);
    router.handle("/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}", noop);
    router
        .host("{tenant}.zoo.example.com")
        .path("/health")
        .handler(noop)
        .methods(&["HEAD", "OPTIONS"]);
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = zoo_router();
    let requests = [
        Request::new(Method::GET, "/zoo/animals/123"),
        Request::new(Method::GET, "/zoo/animals/123/toys/456"),
        Request::new(Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        Request::new(Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        Request::new(Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
        Request::new(Method::HEAD, "/health").with_host("north.zoo.example.com"),
    ];

    c.bench_function("route_match", |b| {
        b.iter(|| {
            for req in &requests {
                black_box(router.find_match(black_box(req)));
            }
        })
    });

    c.bench_function("route_serve", |b| {
        b.iter(|| {
            for req in &requests {
                black_box(router.serve(black_box(req)));
            }
        })
    });
}

fn bench_url_building(c: &mut Criterion) {
    let mut router = zoo_router();
    router
        .path("/zoo/{category}/animals/{id:[0-9]+}")
        .name("animal");

    c.bench_function("url_build", |b| {
        b.iter(|| black_box(router.url("animal", black_box(&["category", "cats", "id", "42"]))))
    });
}

criterion_group!(benches, bench_route_throughput, bench_url_building);
criterion_main!(benches);
