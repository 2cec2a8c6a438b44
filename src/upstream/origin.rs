//! Base-prefix URL rewriting between the caller origin and the upstream.
//!
//! Both directions are plain string substitutions anchored at the start of
//! the value. Nothing is parsed: a value that does not start with the
//! expected base comes back untouched, and a base appearing later in the
//! value (inside a query string, say) is never replaced.

use std::borrow::Cow;

/// Maps URLs between the caller's base and the fixed upstream base.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    upstream_base: String,
}

impl UrlRewriter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self {
            upstream_base: upstream_base.into(),
        }
    }

    pub fn upstream_base(&self) -> &str {
        &self.upstream_base
    }

    /// Build the upstream URL for an inbound URL.
    pub fn to_upstream<'a>(&self, inbound_url: &'a str, caller_base: &str) -> Cow<'a, str> {
        replace_prefix(inbound_url, caller_base, &self.upstream_base)
    }

    /// Point a link at the caller's origin if it targets the upstream.
    pub fn to_caller<'a>(&self, value: &'a str, caller_base: &str) -> Cow<'a, str> {
        replace_prefix(value, &self.upstream_base, caller_base)
    }
}

fn replace_prefix<'a>(value: &'a str, from: &str, to: &str) -> Cow<'a, str> {
    match value.strip_prefix(from) {
        Some(rest) if !from.is_empty() => Cow::Owned(format!("{to}{rest}")),
        _ => Cow::Borrowed(value),
    }
}
