use std::hint::black_box;
use std::sync::Arc;

use convroute::convention::parse_handler_name;
use convroute::pipeline::handler_fn;
use convroute::router::{RouteKey, Router};
use convroute::{IncomingRequest, RequestContext, RoutingContext};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;

const ROUTES: &[(Method, &str)] = &[
    (Method::GET, "/"),
    (Method::GET, "/zoo/animals"),
    (Method::POST, "/zoo/animals"),
    (Method::GET, "/zoo/animals/:id"),
    (Method::PUT, "/zoo/animals/:id"),
    (Method::PATCH, "/zoo/animals/:id"),
    (Method::DELETE, "/zoo/animals/:id"),
    (Method::GET, "/zoo/animals/:id/toys/:toy_id"),
    (Method::GET, "/zoo/:kind/animals/:id/habitats/:habitat/sections/:section"),
    (Method::POST, "/inventory/:a/feeds/:b/items/:c/batches/:d"),
    (Method::GET, "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i"),
    (Method::HEAD, "/zoo/health"),
];

const LOOKUPS: &[(Method, &str)] = &[
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/456"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
];

fn bench_convention(c: &mut Criterion) {
    let identifiers = [
        "HandleGet",
        "HandleGetUserById",
        "HandlePostUser",
        "HandleDeleteOrderItemsByOrderId",
        "HandleGetAPIStatus",
    ];
    c.bench_function("parse_handler_name", |b| {
        b.iter(|| {
            for identifier in identifiers {
                black_box(parse_handler_name(identifier, "/user").ok());
            }
        })
    });
}

fn bench_route_match(c: &mut Criterion) {
    let mut router = Router::new();
    for (method, path) in ROUTES {
        router.insert(RouteKey::new(method.clone(), path));
    }
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in LOOKUPS {
                black_box(router.route(method, path));
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let routing = Arc::new(RoutingContext::default());
    for (method, path) in ROUTES {
        routing.register_route(
            method.clone(),
            path,
            "bench",
            handler_fn(|ctx: &mut RequestContext| ctx.text(200, "ok")),
        );
    }
    c.bench_function("dispatch_in_process", |b| {
        b.iter(|| {
            for (method, path) in LOOKUPS {
                let response = routing.dispatch(IncomingRequest::new(method.clone(), path));
                black_box(response.status);
            }
        })
    });
}

criterion_group!(benches, bench_convention, bench_route_match, bench_dispatch);
criterion_main!(benches);
