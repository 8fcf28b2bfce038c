use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouteError;
use crate::matcher::RequestMatcher;
use crate::router::ParamVec;
use crate::server::Request;

/// Default sub-pattern for `{name}` in a path template.
const PATH_SEGMENT: &str = "[^/]+";
/// Default sub-pattern for `{name}` in a host template.
const HOST_LABEL: &str = "[^.]+";

/// A single template variable.
#[derive(Debug, Clone)]
pub struct TemplateVar {
    name: Arc<str>,
    group: String,
    source: String,
    pattern: Regex,
}

impl TemplateVar {
    /// Variable name as written in the template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's sub-pattern as written (or the default for `{name}`).
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Var(usize),
}

/// A compiled host or path template.
///
/// Built once at registration and read-only afterwards, so a route's templates
/// can be shared across any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    raw: String,
    regex: Regex,
    vars: Vec<TemplateVar>,
    reverse: Vec<Piece>,
    is_host: bool,
    is_prefix: bool,
    loose_trailing_slash: bool,
    // The template ends in `{var}/` with an optional slash; a greedy last
    // variable can swallow that slash, which extraction gives back.
    slash_after_last_var: bool,
}

impl RouteTemplate {
    /// Compile `template` into a matcher.
    ///
    /// * `is_host` - compile against the request host; `{name}` stops at `.`.
    ///   Host templates are never prefix matches and never slash tolerant.
    /// * `is_prefix` - anchor only at the start. Prefix templates ignore
    ///   `loose_trailing_slash`.
    /// * `loose_trailing_slash` - accept the request with or without a trailing `/`.
    ///   Redirecting to the canonical form is not this type's concern.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidTemplate`] if a path template doesn't start with `/`
    /// - [`RouteError::UnbalancedBraces`] for mismatched `{`/`}`
    /// - [`RouteError::MissingNameOrPattern`] for `{}` or `{name:}`
    /// - [`RouteError::DuplicateVariable`] if a name repeats inside the template
    /// - [`RouteError::InvalidPattern`] if a sub-pattern doesn't compile
    pub fn compile(
        template: &str,
        is_host: bool,
        is_prefix: bool,
        loose_trailing_slash: bool,
    ) -> Result<Self, RouteError> {
        if !is_host && !template.starts_with('/') {
            return Err(RouteError::InvalidTemplate {
                template: template.to_string(),
            });
        }

        let (is_prefix, loose_trailing_slash) = if is_host {
            (false, false)
        } else if is_prefix {
            (true, false)
        } else {
            (false, loose_trailing_slash)
        };
        let default_pattern = if is_host { HOST_LABEL } else { PATH_SEGMENT };

        // The optional slash is re-added to both the regex and the reverse form.
        let mut body = template;
        let mut end_slash = false;
        if loose_trailing_slash {
            if let Some(stripped) = body.strip_suffix('/') {
                body = stripped;
                end_slash = true;
            }
        }

        let braces = brace_indices(body).map_err(|()| RouteError::UnbalancedBraces {
            template: template.to_string(),
        })?;

        let mut pattern = String::with_capacity(body.len() + 16);
        pattern.push('^');
        let mut vars: Vec<TemplateVar> = Vec::with_capacity(braces.len());
        let mut reverse = Vec::with_capacity(braces.len() * 2 + 1);
        let mut end = 0;

        for (open, close) in braces {
            let literal = &body[end..open];
            end = close;

            let inner = &body[open + 1..close - 1];
            let (name, sub) = inner.split_once(':').unwrap_or((inner, default_pattern));
            if name.is_empty() || sub.is_empty() {
                return Err(RouteError::MissingNameOrPattern {
                    placeholder: body[open..close].to_string(),
                });
            }
            if vars.iter().any(|v| v.name.as_ref() == name) {
                return Err(RouteError::DuplicateVariable {
                    name: name.to_string(),
                });
            }

            let group = format!("v{}", vars.len());
            pattern.push_str(&regex::escape(literal));
            pattern.push_str(&format!("(?P<{group}>{sub})"));

            let anchored = format!("^(?:{sub})$");
            let compiled = Regex::new(&anchored).map_err(|e| RouteError::InvalidPattern {
                pattern: sub.to_string(),
                message: e.to_string(),
            })?;

            if !literal.is_empty() {
                reverse.push(Piece::Literal(literal.to_string()));
            }
            reverse.push(Piece::Var(vars.len()));
            vars.push(TemplateVar {
                name: Arc::from(name),
                group,
                source: sub.to_string(),
                pattern: compiled,
            });
        }

        let tail = &body[end..];
        pattern.push_str(&regex::escape(tail));
        if loose_trailing_slash {
            pattern.push_str("[/]?");
        }
        if !is_prefix {
            pattern.push('$');
        }

        let slash_after_last_var = end_slash && tail.is_empty() && !vars.is_empty();
        let mut tail = tail.to_string();
        if end_slash {
            tail.push('/');
        }
        if !tail.is_empty() {
            reverse.push(Piece::Literal(tail));
        }

        let regex = Regex::new(&pattern).map_err(|e| RouteError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: template.to_string(),
            regex,
            vars,
            reverse,
            is_host,
            is_prefix,
            loose_trailing_slash,
            slash_after_last_var,
        })
    }

    /// The template text as registered.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.raw
    }

    /// The assembled regular expression.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Variable names in template order.
    pub fn var_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.vars.iter().map(|v| v.name.as_ref())
    }

    /// Variables in template order.
    #[must_use]
    pub fn vars(&self) -> &[TemplateVar] {
        &self.vars
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    #[must_use]
    pub fn is_prefix(&self) -> bool {
        self.is_prefix
    }

    #[must_use]
    pub fn is_loose_trailing_slash(&self) -> bool {
        self.loose_trailing_slash
    }

    /// Whether the registered template text ends with `/`.
    #[must_use]
    pub fn ends_with_slash(&self) -> bool {
        self.raw.ends_with('/')
    }

    /// Test a host or path against the template.
    #[inline]
    #[must_use]
    pub fn is_match(&self, component: &str) -> bool {
        self.regex.is_match(component)
    }

    /// Match `component` and append the captured variables to `params`.
    ///
    /// Returns `false` (leaving `params` untouched) when the component doesn't match.
    pub fn extract(&self, component: &str, params: &mut ParamVec) -> bool {
        let Some(caps) = self.regex.captures(component) else {
            return false;
        };
        let last = self.vars.len().saturating_sub(1);
        for (i, var) in self.vars.iter().enumerate() {
            if let Some(m) = caps.name(&var.group) {
                let mut value = m.as_str();
                if self.slash_after_last_var && i == last {
                    if let Some(trimmed) = value.strip_suffix('/') {
                        if var.pattern.is_match(trimmed) {
                            value = trimmed;
                        }
                    }
                }
                params.push((Arc::clone(&var.name), value.to_string()));
            }
        }
        true
    }

    /// Rebuild a host or path from variable values.
    ///
    /// Every variable in the template must be present in `values`, and every
    /// value must match its variable's sub-pattern. Extra entries are ignored,
    /// which lets the host and path templates of a route share one lookup table.
    ///
    /// # Errors
    ///
    /// [`RouteError::MissingVariable`] or [`RouteError::VariableMismatch`].
    pub fn build(&self, values: &HashMap<&str, &str>) -> Result<String, RouteError> {
        let mut out = String::with_capacity(self.raw.len());
        for piece in &self.reverse {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Var(idx) => {
                    let var = &self.vars[*idx];
                    let value = values.get(var.name.as_ref()).ok_or_else(|| {
                        RouteError::MissingVariable {
                            name: var.name.to_string(),
                        }
                    })?;
                    if !var.pattern.is_match(value) {
                        return Err(RouteError::VariableMismatch {
                            name: var.name.to_string(),
                            value: (*value).to_string(),
                            pattern: var.source.clone(),
                        });
                    }
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Error if any variable of `self` also appears in `other`.
    pub(crate) fn ensure_disjoint(&self, other: &RouteTemplate) -> Result<(), RouteError> {
        match self.var_names().find(|n| other.var_names().any(|o| o == *n)) {
            Some(name) => Err(RouteError::DuplicateVariable {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl RequestMatcher for RouteTemplate {
    fn matches(&self, req: &Request) -> bool {
        if self.is_host {
            self.is_match(req.host_without_port())
        } else {
            self.is_match(req.path())
        }
    }
}

/// Positions of the top-level `{...}` placeholders as `(open, close_exclusive)`.
///
/// Nested braces are allowed inside a pattern, e.g. `{id:[0-9]{4}}`.
fn brace_indices(s: &str) -> Result<Vec<(usize, usize)>, ()> {
    let mut level = 0usize;
    let mut start = 0;
    let mut out = Vec::new();
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => {
                level += 1;
                if level == 1 {
                    start = i;
                }
            }
            b'}' => {
                if level == 0 {
                    return Err(());
                }
                level -= 1;
                if level == 0 {
                    out.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    if level != 0 {
        return Err(());
    }
    Ok(out)
}
