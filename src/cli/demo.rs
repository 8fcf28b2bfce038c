//! The demo application served by `routemux serve`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::context::Context;
use crate::dispatcher::{ContextHandler, Controller, Databus};
use crate::router::{Router, SlashPolicy};
use crate::server::{Request, Response};
use crate::session::SessionProvider;

const SESSION_COOKIE: &str = "routemux_sid";
const DEMO_TOKEN: &str = "Bearer demo";

struct SessionEntry {
    touched: Instant,
    values: HashMap<String, String>,
}

/// In-process session store with idle expiry.
pub struct MemorySessions {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl MemorySessions {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionProvider for MemorySessions {
    fn get(&self, sid: &str, key: &str) -> Option<String> {
        let mut entries = self.lock();
        let entry = entries.get_mut(sid)?;
        entry.touched = Instant::now();
        entry.values.get(key).cloned()
    }

    fn set(&self, sid: &str, key: &str, value: String) {
        let mut entries = self.lock();
        let entry = entries
            .entry(sid.to_string())
            .or_insert_with(|| SessionEntry {
                touched: Instant::now(),
                values: HashMap::new(),
            });
        entry.touched = Instant::now();
        entry.values.insert(key.to_string(), value);
    }

    fn delete(&self, sid: &str, key: &str) {
        if let Some(entry) = self.lock().get_mut(sid) {
            entry.values.remove(key);
        }
    }

    fn flush(&self, sid: &str) {
        self.lock().remove(sid);
    }

    fn gc(&self) {
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.touched.elapsed() < ttl);
        debug!(expired = before - entries.len(), live = entries.len(), "Session sweep");
    }
}

fn write_json<T: Serialize>(ctx: &mut Context<'_>, status: u16, value: &T) {
    if let Err(e) = ctx.json(status, value) {
        warn!(error = %e, "Failed to serialize response");
        ctx.set_status(500);
    }
}

/// `/users/{id}`: reads are open, writes need `authorization: Bearer demo`.
#[derive(Default)]
struct UserController {
    id: String,
}

impl Controller for UserController {
    fn prepare(&mut self, ctx: &mut Context<'_>) {
        self.id = ctx.param("id").unwrap_or_default().to_string();
    }

    fn check_auth(&mut self, ctx: &mut Context<'_>) -> bool {
        if ctx.header("authorization") == Some(DEMO_TOKEN) {
            return true;
        }
        ctx.set_status(401);
        ctx.write_str("unauthorized");
        false
    }

    fn get(&mut self, ctx: &mut Context<'_>) {
        write_json(ctx, 200, &json!({ "id": self.id }));
    }

    fn put(&mut self, ctx: &mut Context<'_>) {
        let name = ctx.form_value("name").unwrap_or_default();
        write_json(ctx, 200, &json!({ "id": self.id, "name": name }));
    }

    fn delete(&mut self, ctx: &mut Context<'_>) {
        ctx.set_status(204);
    }
}

/// `/hello`: greets the caller and counts their visits in the session.
struct Greeting {
    user: Option<String>,
    visits: Option<u64>,
}

impl ContextHandler for Greeting {
    fn dependencies() -> &'static [&'static str] {
        &["user", "visits"]
    }

    fn from_databus(bus: &mut Databus) -> Self {
        Greeting {
            user: bus.take::<String>("user"),
            visits: bus.take::<u64>("visits"),
        }
    }

    fn serve_context(&mut self, ctx: &mut Context<'_>) {
        let body = json!({
            "hello": self.user.as_deref().unwrap_or("stranger"),
            "visits": self.visits.unwrap_or(0),
        });
        write_json(ctx, 200, &body);
    }
}

/// Build the demo routing table on top of `config`.
#[must_use]
pub fn demo_router(config: RouterConfig, sessions: Arc<MemorySessions>) -> Router {
    let mut router = Router::with_config(config);

    router.filter(|req: &Request, res: &mut Response| {
        if req.path().split('/').any(|seg| seg == "..") {
            res.set_status(400);
            res.write_str("400 Bad Request");
            return false;
        }
        true
    });

    router.add_service("user", |ctx: &mut Context<'_>, bus: &mut Databus| {
        if let Some(user) = ctx.query("name").or_else(|| ctx.header("x-user").map(str::to_string)) {
            bus.set("user", user);
        }
    });

    router.add_service("visits", move |ctx: &mut Context<'_>, bus: &mut Databus| {
        let sid = match ctx.cookie(SESSION_COOKIE) {
            Some(sid) => sid,
            None => {
                let sid = ulid::Ulid::new().to_string();
                ctx.set_header("set-cookie", &format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly"));
                sid
            }
        };
        let visits = sessions
            .get(&sid, "visits")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        sessions.set(&sid, "visits", visits.to_string());
        bus.set("visits", visits);
    });

    router
        .handle("/", |ctx: &mut Context<'_>| {
            ctx.set_header("content-type", "text/plain; charset=utf-8");
            ctx.write_str("routemux demo\n");
        })
        .methods(&["GET", "HEAD"])
        .name("home");

    router
        .handle("/health", |ctx: &mut Context<'_>| {
            write_json(ctx, 200, &json!({ "status": "ok" }));
        })
        .methods(&["GET"])
        .name("health");

    router
        .controller::<UserController>("/users/{id:[0-9]+}")
        .name("user");

    router.context_handler::<Greeting>("/hello").name("hello");

    router
        .handle("/account", |ctx: &mut Context<'_>| {
            let secure = ctx.request().is_tls();
            write_json(ctx, 200, &json!({ "secure": secure }));
        })
        .only_scheme("https")
        .name("account");

    router
        .host("{tenant:[a-z0-9-]+}.example.com")
        .path("/tenant")
        .handler(|ctx: &mut Context<'_>| {
            let tenant = ctx.param("tenant").unwrap_or_default().to_string();
            write_json(ctx, 200, &json!({ "tenant": tenant }));
        })
        .name("tenant");

    router
        .handle("/docs/", |ctx: &mut Context<'_>| {
            ctx.write_str("docs index");
        })
        .slash_policy(SlashPolicy::RedirectToCanonical)
        .name("docs");

    router
        .path_prefix("/static/")
        .handler(|ctx: &mut Context<'_>| {
            let rest = ctx.request().path().trim_start_matches("/static/").to_string();
            ctx.write_str(&format!("static asset: {rest}"));
        })
        .name("static");

    router
        .path("/articles/{category}/{slug}")
        .build_only()
        .name("article");

    router
}
