use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::controller::{run_lifecycle, Controller, LifecycleOptions};
use super::databus::{ContextHandler, Databus, DatabusSchema, ServiceRegistry};
use crate::context::Context;

/// A plain request handler with no lifecycle.
pub trait Handler: Send + Sync {
    fn serve(&self, ctx: &mut Context<'_>);
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>) + Send + Sync,
{
    fn serve(&self, ctx: &mut Context<'_>) {
        self(ctx)
    }
}

/// Builds a fresh controller for each request.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

type ContextRunner = Arc<dyn Fn(&mut Context<'_>, &mut Databus) + Send + Sync>;

/// What a route dispatches to once it has matched.
///
/// Controller and context-handler variants carry a constructor, not an instance:
/// each request gets its own object, so nothing mutable is shared between requests.
#[derive(Clone)]
pub enum HandlerKind {
    Raw(Arc<dyn Handler>),
    Controller {
        type_name: &'static str,
        factory: ControllerFactory,
    },
    Context {
        schema: DatabusSchema,
        run: ContextRunner,
    },
}

impl HandlerKind {
    pub fn raw<H: Handler + 'static>(handler: H) -> Self {
        HandlerKind::Raw(Arc::new(handler))
    }

    /// A controller built with `C::default()` per request.
    #[must_use]
    pub fn controller<C: Controller + Default + 'static>() -> Self {
        HandlerKind::Controller {
            type_name: std::any::type_name::<C>(),
            factory: Arc::new(|| Box::new(C::default()) as Box<dyn Controller>),
        }
    }

    /// A controller built by `factory` per request.
    pub fn controller_fn<C, F>(factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        HandlerKind::Controller {
            type_name: std::any::type_name::<C>(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Controller>),
        }
    }

    /// A context handler of type `H`. Its dependency list is read once, here.
    #[must_use]
    pub fn context<H: ContextHandler>() -> Self {
        HandlerKind::Context {
            schema: DatabusSchema::for_handler::<H>(),
            run: Arc::new(serve_context_handler::<H>),
        }
    }

    /// A context handler written as a closure over the filled databus.
    pub fn context_fn<F>(dependencies: &[&'static str], f: F) -> Self
    where
        F: Fn(&mut Context<'_>, &mut Databus) + Send + Sync + 'static,
    {
        HandlerKind::Context {
            schema: DatabusSchema::new("context_fn", dependencies),
            run: Arc::new(f),
        }
    }

    /// Short label used in logs and route dumps.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerKind::Raw(_) => "raw",
            HandlerKind::Controller { .. } => "controller",
            HandlerKind::Context { .. } => "context",
        }
    }

    /// Build the per-request handler and run it against `ctx`.
    pub fn invoke(&self, ctx: &mut Context<'_>, services: &ServiceRegistry, opts: LifecycleOptions) {
        match self {
            HandlerKind::Raw(handler) => handler.serve(ctx),
            HandlerKind::Controller { type_name, factory } => {
                let mut controller = factory();
                let outcome = run_lifecycle(controller.as_mut(), ctx, opts);
                debug!(controller = %type_name, outcome = ?outcome, "Controller lifecycle done");
            }
            HandlerKind::Context { schema, run } => {
                let mut bus = Databus::new(schema);
                services.run_bus(schema.handler(), ctx, &mut bus);
                run(ctx, &mut bus);
            }
        }
    }
}

fn serve_context_handler<H: ContextHandler>(ctx: &mut Context<'_>, bus: &mut Databus) {
    let mut handler = H::from_databus(bus);
    handler.serve_context(ctx);
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Raw(_) => f.write_str("Raw(..)"),
            HandlerKind::Controller { type_name, .. } => {
                f.debug_struct("Controller").field("type", type_name).finish()
            }
            HandlerKind::Context { schema, .. } => f
                .debug_struct("Context")
                .field("handler", &schema.handler())
                .field("fields", &schema.fields())
                .finish(),
        }
    }
}
