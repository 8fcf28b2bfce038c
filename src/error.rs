use std::fmt;

/// Registration-time routing error.
///
/// These are produced while a route is being built and are stored on the route
/// rather than returned through the builder chain. A route carrying an error never
/// matches a request; the error is visible through [`crate::router::Route::error`]
/// and [`crate::router::Router::errors`].
///
/// URL building reuses the same type for the failures it can hit
/// (`OddParameterCount`, `MissingVariable`, `VariableMismatch`, `NoTemplate`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A path template did not start with `/`.
    InvalidTemplate {
        /// The rejected template
        template: String,
    },
    /// A template contained a `{` without its `}` (or the reverse).
    UnbalancedBraces {
        /// The rejected template
        template: String,
    },
    /// A placeholder such as `{}` or `{id:}` was missing its name or pattern.
    MissingNameOrPattern {
        /// The offending placeholder text, braces included
        placeholder: String,
    },
    /// The same variable name appears twice in a route's host and path templates.
    DuplicateVariable {
        /// The repeated variable name
        name: String,
    },
    /// A variable pattern (or the assembled template) is not a valid regular expression.
    InvalidPattern {
        /// The pattern handed to the regex compiler
        pattern: String,
        /// The compiler's message
        message: String,
    },
    /// A name/value pair list had an odd number of elements.
    OddParameterCount {
        /// Number of elements received
        count: usize,
    },
    /// A header name passed to `headers(..)` is not a valid HTTP header name.
    InvalidHeaderName {
        /// The rejected name
        name: String,
    },
    /// A name passed to `methods(..)` is not a valid HTTP method token.
    InvalidMethod {
        /// The rejected name
        method: String,
    },
    /// `only_scheme` was given something other than `http` or `https`.
    InvalidScheme {
        /// The rejected scheme
        scheme: String,
    },
    /// URL building was missing a value for a template variable.
    MissingVariable {
        /// The variable without a value
        name: String,
    },
    /// A value supplied for URL building does not satisfy the variable's pattern.
    VariableMismatch {
        /// The variable name
        name: String,
        /// The rejected value
        value: String,
        /// The variable's pattern
        pattern: String,
    },
    /// URL building needs a host or path template the route does not have.
    NoTemplate {
        /// Which component was requested: `"host"`, `"path"` or `"host or path"`
        component: &'static str,
    },
    /// A second terminal handler was attached to the same route.
    HandlerAlreadySet,
    /// [`crate::router::Router::url`] was asked for a route name nobody registered.
    UnknownRoute {
        /// The requested route name
        name: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidTemplate { template } => {
                write!(f, "path template must start with a slash, got {template:?}")
            }
            RouteError::UnbalancedBraces { template } => {
                write!(f, "unbalanced braces in template {template:?}")
            }
            RouteError::MissingNameOrPattern { placeholder } => {
                write!(f, "missing name or pattern in {placeholder:?}")
            }
            RouteError::DuplicateVariable { name } => {
                write!(f, "duplicated route variable {name:?}")
            }
            RouteError::InvalidPattern { pattern, message } => {
                write!(f, "invalid pattern {pattern:?}: {message}")
            }
            RouteError::OddParameterCount { count } => {
                write!(
                    f,
                    "number of parameters must be a multiple of 2, got {count}"
                )
            }
            RouteError::InvalidHeaderName { name } => {
                write!(f, "invalid header name {name:?}")
            }
            RouteError::InvalidMethod { method } => {
                write!(f, "invalid method name {method:?}")
            }
            RouteError::InvalidScheme { scheme } => {
                write!(f, "unsupported scheme {scheme:?}, expected http or https")
            }
            RouteError::MissingVariable { name } => {
                write!(f, "missing value for route variable {name:?}")
            }
            RouteError::VariableMismatch {
                name,
                value,
                pattern,
            } => write!(
                f,
                "value {value:?} for route variable {name:?} does not match {pattern:?}"
            ),
            RouteError::NoTemplate { component } => {
                write!(f, "route doesn't have a {component}")
            }
            RouteError::HandlerAlreadySet => write!(f, "route already has a handler"),
            RouteError::UnknownRoute { name } => write!(f, "no route named {name:?}"),
        }
    }
}

impl std::error::Error for RouteError {}

/// Converts a flat `name, value, name, value, ...` list into pairs.
///
/// Shared by the header/query matchers and URL building.
pub(crate) fn pairs_from_flat<'a>(flat: &[&'a str]) -> Result<Vec<(&'a str, &'a str)>, RouteError> {
    if flat.len() % 2 != 0 {
        return Err(RouteError::OddParameterCount { count: flat.len() });
    }
    Ok(flat.chunks_exact(2).map(|kv| (kv[0], kv[1])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_from_flat() {
        let pairs = pairs_from_flat(&["a", "1", "b", ""]).unwrap();
        assert_eq!(pairs, vec![("a", "1"), ("b", "")]);
        assert!(pairs_from_flat(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_pairs_from_flat_rejects_odd() {
        assert_eq!(
            pairs_from_flat(&["a", "1", "b"]),
            Err(RouteError::OddParameterCount { count: 3 })
        );
    }

    #[test]
    fn test_display_mentions_variable() {
        let err = RouteError::DuplicateVariable {
            name: "id".to_string(),
        };
        assert!(err.to_string().contains("\"id\""));
    }
}
