//! # Template Module
//!
//! Compiles host and path templates into regular expressions.
//!
//! A template is literal text with named placeholders:
//!
//! - `{name}` matches a maximal run of characters up to the next separator
//!   (`/` in paths, `.` in hosts)
//! - `{name:pattern}` matches exactly `pattern`, a regular expression
//!
//! ```rust
//! use routemux::template::RouteTemplate;
//!
//! let tpl = RouteTemplate::compile("/articles/{category}/{id:[0-9]+}", false, false, false).unwrap();
//! assert!(tpl.is_match("/articles/tech/42"));
//! assert!(!tpl.is_match("/articles/tech/abc"));
//! assert_eq!(tpl.var_names().collect::<Vec<_>>(), vec!["category", "id"]);
//! ```
//!
//! Each compiled template also keeps a reverse-build form, so the same template
//! can turn variable bindings back into a URL (see [`RouteTemplate::build`]).
//!
//! Placeholders compile to named capture groups, so user patterns are free to
//! contain their own groups without shifting variable positions.

mod core;
#[cfg(test)]
mod tests;

pub use core::{RouteTemplate, TemplateVar};
