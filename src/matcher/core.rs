use std::fmt;
use std::sync::Arc;

use http::header::HeaderName;
use http::Method;
use smallvec::SmallVec;

use crate::error::{pairs_from_flat, RouteError};
use crate::server::Request;
use crate::template::RouteTemplate;

/// A pure predicate over a request.
pub trait RequestMatcher: Send + Sync {
    fn matches(&self, req: &Request) -> bool;
}

impl<F> RequestMatcher for F
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    fn matches(&self, req: &Request) -> bool {
        self(req)
    }
}

/// Allowed-method set, normalised to upper case at construction.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: SmallVec<[Method; 4]>,
}

impl MethodMatcher {
    /// Build from method names.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidMethod`] for the first name that isn't a method token
    /// (empty, or containing spaces or separators).
    pub fn new<I, S>(methods: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = methods
            .into_iter()
            .map(|m| {
                let name = m.as_ref();
                Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    RouteError::InvalidMethod {
                        method: name.to_string(),
                    }
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { methods })
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl RequestMatcher for MethodMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.methods.iter().any(|m| m == req.method())
    }
}

/// Required headers. An empty expected value only requires presence;
/// otherwise one of the header's values must equal it exactly.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    pairs: Vec<(HeaderName, String)>,
}

impl HeaderMatcher {
    /// Build from a flat `name, value, name, value, ...` list.
    ///
    /// # Errors
    ///
    /// [`RouteError::OddParameterCount`] for an odd-length list,
    /// [`RouteError::InvalidHeaderName`] for a name that isn't a header token.
    pub fn from_pairs(flat: &[&str]) -> Result<Self, RouteError> {
        let pairs = pairs_from_flat(flat)?
            .into_iter()
            .map(|(k, v)| {
                HeaderName::from_bytes(k.as_bytes())
                    .map(|name| (name, v.to_string()))
                    .map_err(|_| RouteError::InvalidHeaderName {
                        name: k.to_string(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { pairs })
    }
}

impl RequestMatcher for HeaderMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.pairs.iter().all(|(name, expected)| {
            let mut values = req.headers().get_all(name).iter().peekable();
            if values.peek().is_none() {
                return false;
            }
            expected.is_empty() || values.any(|v| v.as_bytes() == expected.as_bytes())
        })
    }
}

/// Required query parameters (case-sensitive keys). An empty expected value
/// only requires presence.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    pairs: Vec<(String, String)>,
}

impl QueryMatcher {
    /// Build from a flat `key, value, key, value, ...` list.
    ///
    /// # Errors
    ///
    /// [`RouteError::OddParameterCount`] for an odd-length list.
    pub fn from_pairs(flat: &[&str]) -> Result<Self, RouteError> {
        let pairs = pairs_from_flat(flat)?
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(Self { pairs })
    }
}

impl RequestMatcher for QueryMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.pairs.iter().all(|(key, expected)| {
            let mut values = req
                .query_pairs()
                .filter(|(k, _)| k == key.as_str())
                .map(|(_, v)| v)
                .peekable();
            if values.peek().is_none() {
                return false;
            }
            expected.is_empty() || values.any(|v| v == expected.as_str())
        })
    }
}

/// One entry in a route's matcher list.
///
/// Templates are kept as their own variant so the route can find them again for
/// variable extraction, redirects and URL building.
#[derive(Clone)]
pub enum Matcher {
    Template(Arc<RouteTemplate>),
    Predicate(Arc<dyn RequestMatcher>),
}

impl Matcher {
    #[inline]
    #[must_use]
    pub fn matches(&self, req: &Request) -> bool {
        match self {
            Matcher::Template(t) => t.matches(req),
            Matcher::Predicate(p) => p.matches(req),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Template(t) => f.debug_tuple("Template").field(&t.template()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
