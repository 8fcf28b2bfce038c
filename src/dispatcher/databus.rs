use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::Context;

/// A lightweight handler with one entry point and named dependencies.
///
/// Each request gets a fresh instance. Before it is built, every name listed in
/// [`dependencies`](Self::dependencies) is looked up among the router's services
/// (see [`crate::router::Router::add_service`]); each service found fills its slot
/// on the [`Databus`], and [`from_databus`](Self::from_databus) then takes the
/// values out. Names without a service are skipped and logged.
///
/// ```rust
/// use routemux::context::Context;
/// use routemux::dispatcher::{ContextHandler, Databus};
///
/// struct Profile {
///     user: Option<String>,
/// }
///
/// impl ContextHandler for Profile {
///     fn dependencies() -> &'static [&'static str] {
///         &["user"]
///     }
///
///     fn from_databus(bus: &mut Databus) -> Self {
///         Profile { user: bus.take::<String>("user") }
///     }
///
///     fn serve_context(&mut self, ctx: &mut Context<'_>) {
///         let who = self.user.as_deref().unwrap_or("anonymous");
///         ctx.write_str(who);
///     }
/// }
/// ```
pub trait ContextHandler: Send + 'static {
    fn dependencies() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }

    fn from_databus(bus: &mut Databus) -> Self
    where
        Self: Sized;

    fn serve_context(&mut self, ctx: &mut Context<'_>);
}

/// Dependency names of one handler type, computed once when the route is registered.
#[derive(Debug, Clone)]
pub struct DatabusSchema {
    handler: &'static str,
    fields: Arc<[&'static str]>,
}

impl DatabusSchema {
    /// Build a schema; repeated names are kept once.
    #[must_use]
    pub fn new(handler: &'static str, fields: &[&'static str]) -> Self {
        let mut unique: Vec<&'static str> = Vec::with_capacity(fields.len());
        for &f in fields {
            if unique.contains(&f) {
                warn!(handler = %handler, field = %f, "Duplicate databus field ignored");
            } else {
                unique.push(f);
            }
        }
        Self {
            handler,
            fields: unique.into(),
        }
    }

    #[must_use]
    pub fn for_handler<H: ContextHandler>() -> Self {
        Self::new(std::any::type_name::<H>(), H::dependencies())
    }

    #[must_use]
    pub fn handler(&self) -> &'static str {
        self.handler
    }

    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

/// Per-request slots for a handler's declared dependencies.
pub struct Databus {
    fields: Arc<[&'static str]>,
    values: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl Databus {
    #[must_use]
    pub fn new(schema: &DatabusSchema) -> Self {
        Self {
            fields: Arc::clone(&schema.fields),
            values: HashMap::with_capacity(schema.fields.len()),
        }
    }

    /// Declared field names, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Whether `name` is a declared field.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|f| *f == name)
    }

    /// Whether a value has been stored for `name`.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Store a value. Returns `false` (and drops the value) if `name` isn't declared.
    pub fn set<T: Any + Send>(&mut self, name: &str, value: T) -> bool {
        match self.fields.iter().find(|f| **f == name) {
            Some(field) => {
                self.values.insert(*field, Box::new(value));
                true
            }
            None => {
                debug!(field = %name, "Ignoring value for undeclared databus field");
                false
            }
        }
    }

    /// Borrow a stored value if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Remove and return a stored value if it has type `T`.
    ///
    /// A value of another type stays in place.
    pub fn take<T: Any>(&mut self, name: &str) -> Option<T> {
        if !self.values.get(name).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(name)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Reset the slot for `name` to empty.
    pub fn clear(&mut self, name: &str) {
        self.values.remove(name);
    }
}

impl fmt::Debug for Databus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databus")
            .field("fields", &self.fields)
            .field("set", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fills a databus slot for the current request.
pub trait DatabusService: Send + Sync {
    fn provide(&self, ctx: &mut Context<'_>, bus: &mut Databus);
}

impl<F> DatabusService for F
where
    F: Fn(&mut Context<'_>, &mut Databus) + Send + Sync,
{
    fn provide(&self, ctx: &mut Context<'_>, bus: &mut Databus) {
        self(ctx, bus)
    }
}

/// Named services owned by a router.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn DatabusService>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `name`, replacing any previous one.
    pub fn add(&mut self, name: &str, service: Arc<dyn DatabusService>) {
        if self.services.insert(name.to_string(), service).is_some() {
            warn!(service = %name, "Replacing databus service");
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Run the service registered for each declared field of `bus`.
    pub fn run_bus(&self, handler: &str, ctx: &mut Context<'_>, bus: &mut Databus) {
        let fields = Arc::clone(&bus.fields);
        for name in fields.iter() {
            match self.services.get(*name) {
                Some(service) => service.provide(ctx, bus),
                None => warn!(
                    handler = %handler,
                    field = %name,
                    "No databus service registered for field"
                ),
            }
        }
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.services.keys().collect();
        names.sort();
        f.debug_struct("ServiceRegistry")
            .field("services", &names)
            .finish()
    }
}
