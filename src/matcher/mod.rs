//! # Matcher Module
//!
//! Request predicates. A route matches when every one of its matchers does.
//!
//! Matchers only read the request; none of them can see or touch the response.
//! The path and host templates (see [`crate::template`]) are matchers too, and
//! additionally yield captured variables when the route is selected.

mod core;

pub use core::{HeaderMatcher, Matcher, MethodMatcher, QueryMatcher, RequestMatcher};
