use std::sync::{Arc, Mutex};

use http::Method;

use super::*;
use crate::context::Context;
use crate::router::ParamVec;
use crate::server::{Request, Response};

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Recorder {
    log: Log,
    auth: bool,
    csrf: bool,
}

impl Recorder {
    fn push(&self, step: &'static str) {
        self.log.lock().unwrap().push(step);
    }
}

impl Controller for Recorder {
    fn init(&mut self, _ctx: &mut Context<'_>) {
        self.push("init");
    }
    fn prepare(&mut self, _ctx: &mut Context<'_>) {
        self.push("prepare");
    }
    fn check_auth(&mut self, ctx: &mut Context<'_>) -> bool {
        self.push("check_auth");
        if !self.auth {
            ctx.set_status(401);
        }
        self.auth
    }
    fn check_csrf(&mut self, _ctx: &mut Context<'_>) -> bool {
        self.push("check_csrf");
        self.csrf
    }
    fn get(&mut self, _ctx: &mut Context<'_>) {
        self.push("get");
    }
    fn post(&mut self, _ctx: &mut Context<'_>) {
        self.push("post");
    }
    fn put(&mut self, _ctx: &mut Context<'_>) {
        self.push("put");
    }
    fn delete(&mut self, _ctx: &mut Context<'_>) {
        self.push("delete");
    }
    fn finish(&mut self, _ctx: &mut Context<'_>) {
        self.push("finish");
    }
}

fn run(req: &Request, auth: bool, csrf: bool, opts: LifecycleOptions) -> (LifecycleOutcome, Vec<&'static str>, Response) {
    let log: Log = Arc::default();
    let mut c = Recorder {
        log: Arc::clone(&log),
        auth,
        csrf,
    };
    let mut res = Response::new();
    let outcome = {
        let mut ctx = Context::new(req, &mut res, ParamVec::new());
        run_lifecycle(&mut c, &mut ctx, opts)
    };
    let steps = log.lock().unwrap().clone();
    (outcome, steps, res)
}

#[test]
fn test_get_skips_checks_by_default() {
    let req = Request::new(Method::GET, "/users/42");
    let (outcome, steps, _) = run(&req, false, false, LifecycleOptions::default());
    assert_eq!(outcome, LifecycleOutcome::Completed(ControllerMethod::Get));
    assert_eq!(steps, vec!["init", "prepare", "get", "finish"]);
}

#[test]
fn test_get_with_opt_in_checks() {
    let req = Request::new(Method::GET, "/");
    let opts = LifecycleOptions {
        check_auth: true,
        check_csrf: true,
    };
    let (outcome, steps, _) = run(&req, true, true, opts);
    assert_eq!(outcome, LifecycleOutcome::Completed(ControllerMethod::Get));
    assert_eq!(
        steps,
        vec!["init", "prepare", "check_auth", "check_csrf", "get", "finish"]
    );
}

#[test]
fn test_auth_rejection_stops_lifecycle() {
    let req = Request::new(Method::DELETE, "/users/1");
    let (outcome, steps, res) = run(&req, false, true, LifecycleOptions::default());
    assert_eq!(outcome, LifecycleOutcome::AuthRejected);
    assert_eq!(steps, vec!["init", "prepare", "check_auth"]);
    assert_eq!(res.status(), 401);
}

#[test]
fn test_csrf_rejection_stops_lifecycle() {
    let req = Request::new(Method::POST, "/users");
    let (outcome, steps, _) = run(&req, true, false, LifecycleOptions::default());
    assert_eq!(outcome, LifecycleOutcome::CsrfRejected);
    assert_eq!(steps, vec!["init", "prepare", "check_auth", "check_csrf"]);
}

#[test]
fn test_method_override() {
    let req = Request::new(Method::POST, "/items/5")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body("_method=PUT&name=x");
    let (outcome, steps, _) = run(&req, true, true, LifecycleOptions::default());
    assert_eq!(outcome, LifecycleOutcome::Completed(ControllerMethod::Put));
    assert!(steps.contains(&"put"));
    assert!(!steps.contains(&"post"));

    let req = Request::new(Method::POST, "/items/5?_method=delete");
    assert_eq!(ControllerMethod::resolve(&req), Some(ControllerMethod::Delete));

    let req = Request::new(Method::GET, "/items/5?_method=delete");
    assert_eq!(ControllerMethod::resolve(&req), Some(ControllerMethod::Get));
}

#[test]
fn test_resolve_table() {
    let cases = [
        (Method::HEAD, Some(ControllerMethod::Head)),
        (Method::PATCH, Some(ControllerMethod::Patch)),
        (Method::OPTIONS, Some(ControllerMethod::Options)),
        (Method::TRACE, None),
    ];
    for (m, expected) in cases {
        assert_eq!(ControllerMethod::resolve(&Request::new(m, "/")), expected);
    }
}

#[test]
fn test_default_hooks_answer_405() {
    #[derive(Default)]
    struct Empty;
    impl Controller for Empty {}

    let req = Request::new(Method::PATCH, "/");
    let mut res = Response::new();
    {
        let mut ctx = Context::new(&req, &mut res, ParamVec::new());
        let outcome = run_lifecycle(&mut Empty, &mut ctx, LifecycleOptions::default());
        assert_eq!(outcome, LifecycleOutcome::Completed(ControllerMethod::Patch));
    }
    assert_eq!(res.status(), 405);
}

#[test]
fn test_unsupported_method_skips_lifecycle() {
    let req = Request::new(Method::TRACE, "/");
    let (outcome, steps, res) = run(&req, true, true, LifecycleOptions::default());
    assert_eq!(outcome, LifecycleOutcome::UnsupportedMethod);
    assert!(steps.is_empty());
    assert_eq!(res.status(), 405);
}

struct Greeter {
    user: Option<String>,
    visits: Option<u32>,
}

impl ContextHandler for Greeter {
    fn dependencies() -> &'static [&'static str] {
        &["user", "visits", "user"]
    }

    fn from_databus(bus: &mut Databus) -> Self {
        Greeter {
            user: bus.take::<String>("user"),
            visits: bus.take::<u32>("visits"),
        }
    }

    fn serve_context(&mut self, ctx: &mut Context<'_>) {
        let body = format!(
            "{}:{}",
            self.user.as_deref().unwrap_or("anon"),
            self.visits.unwrap_or(0)
        );
        ctx.write_str(&body);
    }
}

#[test]
fn test_schema_is_deduplicated() {
    let schema = DatabusSchema::for_handler::<Greeter>();
    assert_eq!(schema.fields(), &["user", "visits"]);
}

#[test]
fn test_context_handler_gets_services() {
    let mut services = ServiceRegistry::new();
    services.add(
        "user",
        Arc::new(|ctx: &mut Context<'_>, bus: &mut Databus| {
            let name = ctx.header("x-user").unwrap_or("nobody").to_string();
            bus.set("user", name);
        }),
    );

    let kind = HandlerKind::context::<Greeter>();
    let req = Request::new(Method::GET, "/").with_header("x-user", "ada");
    let mut res = Response::new();
    {
        let mut ctx = Context::new(&req, &mut res, ParamVec::new());
        kind.invoke(&mut ctx, &services, LifecycleOptions::default());
    }
    assert_eq!(res.body(), b"ada:0");
}

#[test]
fn test_databus_rejects_undeclared_and_mistyped() {
    let schema = DatabusSchema::new("test", &["a"]);
    let mut bus = Databus::new(&schema);
    assert!(bus.has("a"));
    assert!(!bus.set("b", 1u8));
    assert!(bus.set("a", 5u32));
    assert!(bus.is_set("a"));
    assert_eq!(bus.get::<u32>("a"), Some(&5));
    assert_eq!(bus.take::<String>("a"), None);
    assert!(bus.is_set("a"));
    assert_eq!(bus.take::<u32>("a"), Some(5));
    assert!(!bus.is_set("a"));
}

#[test]
fn test_controller_instances_are_per_request() {
    #[derive(Default)]
    struct Counter {
        hits: u32,
    }
    impl Controller for Counter {
        fn get(&mut self, ctx: &mut Context<'_>) {
            self.hits += 1;
            ctx.write_str(&self.hits.to_string());
        }
    }

    let kind = HandlerKind::controller::<Counter>();
    let services = ServiceRegistry::new();
    for _ in 0..3 {
        let req = Request::new(Method::GET, "/");
        let mut res = Response::new();
        {
            let mut ctx = Context::new(&req, &mut res, ParamVec::new());
            kind.invoke(&mut ctx, &services, LifecycleOptions::default());
        }
        assert_eq!(res.body(), b"1");
    }
}
