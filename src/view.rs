//! Template rendering boundary.
//!
//! The router never compiles or evaluates templates itself. Applications plug a
//! [`Renderer`] into the router and handlers reach it through
//! [`crate::context::Context::render`].

use std::fmt;

use serde_json::Value;

/// Renders a named view with JSON data.
pub trait Renderer: Send + Sync {
    /// # Errors
    ///
    /// Implementations report unknown templates and evaluation failures.
    fn render(&self, name: &str, data: &Value) -> Result<Vec<u8>, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &Value) -> Result<Vec<u8>, RenderError> + Send + Sync,
{
    fn render(&self, name: &str, data: &Value) -> Result<Vec<u8>, RenderError> {
        self(name, data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No template is registered under this name.
    NotFound(String),
    /// No renderer was installed on the router.
    NoRenderer,
    /// The renderer failed while producing output.
    Failed(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotFound(name) => write!(f, "template {name:?} not found"),
            RenderError::NoRenderer => write!(f, "no renderer configured"),
            RenderError::Failed(msg) => write!(f, "render failed: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}
