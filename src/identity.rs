//! Caller identity resolution.
//!
//! The host's auth layer (if any) puts a [`CurrentCaller`] into the request
//! extensions. Absence of that extension means "no auth system configured"
//! and resolves to no identity, never to an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Attribute names probed in order; first non-empty value wins.
pub const IDENTITY_ATTRIBUTES: [&str; 5] = ["name", "username", "login", "uid", "id"];

/// The "current user" capability exposed by an auth subsystem.
pub trait Caller: fmt::Display + Send + Sync {
    /// Anonymous callers never produce an identity.
    fn is_authenticated(&self) -> bool;

    /// Look up a named attribute; `None` when the caller does not carry it.
    fn attribute(&self, name: &str) -> Option<String>;
}

/// Request extension carrying the authenticated caller, if any.
#[derive(Clone)]
pub struct CurrentCaller(pub Arc<dyn Caller>);

impl CurrentCaller {
    pub fn new(caller: impl Caller + 'static) -> Self {
        Self(Arc::new(caller))
    }
}

impl fmt::Debug for CurrentCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CurrentCaller").field(&self.0.to_string()).finish()
    }
}

pub fn resolve_identity(caller: Option<&dyn Caller>) -> Option<String> {
    let caller = caller?;
    if !caller.is_authenticated() {
        return None;
    }

    IDENTITY_ATTRIBUTES
        .iter()
        .filter_map(|attr| caller.attribute(attr))
        .find(|value| !value.is_empty())
        .or_else(|| Some(caller.to_string()))
}

// ─── Map-backed caller ───────────────────────────────────────────

/// Simple attribute bag, handy for auth layers that decode a token into
/// key/value claims.
#[derive(Debug, Clone, Default)]
pub struct AttributeCaller {
    attributes: HashMap<String, String>,
    anonymous: bool,
    repr: String,
}

impl AttributeCaller {
    pub fn new(repr: impl Into<String>) -> Self {
        Self {
            attributes: HashMap::new(),
            anonymous: false,
            repr: repr.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            attributes: HashMap::new(),
            anonymous: true,
            repr: "anonymous".into(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl fmt::Display for AttributeCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Caller for AttributeCaller {
    fn is_authenticated(&self) -> bool {
        !self.anonymous
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}
