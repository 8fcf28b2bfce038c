use tracing::debug;

use super::route::{Route, SchemeConstraint, SlashPolicy};
use crate::config::RouterConfig;
use crate::server::Request;

/// Trailing-slash redirects always use 307 so the method and body survive.
pub const SLASH_REDIRECT_STATUS: u16 = 307;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    Scheme,
    TrailingSlash,
}

/// A redirect decided for a matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
    pub reason: RedirectReason,
}

/// Scheme check first; the slash check only runs if the scheme is fine.
#[must_use]
pub fn decide(route: &Route, req: &Request, config: &RouterConfig) -> Option<Redirect> {
    scheme_redirect(route, req, config).or_else(|| slash_redirect(route, req))
}

/// Redirect to the other scheme when the route's scheme constraint is violated.
///
/// The target host is the configured counterpart host, else the request host
/// without its port (the port belongs to the listener the client reached).
/// Path and query are kept.
#[must_use]
pub fn scheme_redirect(route: &Route, req: &Request, config: &RouterConfig) -> Option<Redirect> {
    let (scheme, configured) = match (route.get_scheme(), req.is_tls()) {
        (SchemeConstraint::Http, true) => ("http", config.http_host.as_deref()),
        (SchemeConstraint::Https, false) => ("https", config.https_host.as_deref()),
        _ => return None,
    };
    let host = configured.unwrap_or_else(|| req.host_without_port());
    let location = format!("{scheme}://{host}{}", req.request_uri());
    debug!(location = %location, "Scheme redirect");
    Some(Redirect {
        location,
        status: config.scheme_redirect_status,
        reason: RedirectReason::Scheme,
    })
}

/// Under [`SlashPolicy::RedirectToCanonical`], redirect when the request path and
/// the path template disagree about a trailing `/`.
#[must_use]
pub fn slash_redirect(route: &Route, req: &Request) -> Option<Redirect> {
    if route.get_slash_policy() != SlashPolicy::RedirectToCanonical {
        return None;
    }
    let template = route.path_template()?;
    if template.is_prefix() {
        return None;
    }
    let path = req.path();
    let want_slash = template.ends_with_slash();
    if path.ends_with('/') == want_slash {
        return None;
    }
    let mut target = if want_slash {
        format!("{path}/")
    } else {
        path[..path.len() - 1].to_string()
    };
    if target.is_empty() {
        target.push('/');
    }
    if let Some(q) = req.query().filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(q);
    }
    debug!(location = %target, "Trailing slash redirect");
    Some(Redirect {
        location: target,
        status: SLASH_REDIRECT_STATUS,
        reason: RedirectReason::TrailingSlash,
    })
}
