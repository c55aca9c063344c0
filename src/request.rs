//! Incoming HTTP request type: the request-scoped context every middleware
//! and handler sees.

use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

use crate::acl::Identity;
use crate::params::{Params, Pooled};

/// An incoming HTTP request with its routing results attached.
///
/// Middleware receive it as `&mut Request` and may annotate it: set the
/// caller [`Identity`], stash values in [`extensions_mut`](Request::extensions_mut),
/// adjust headers. Handlers receive it by value once it has been routed.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: Pooled,
    pub(crate) route: Option<Arc<str>>,
    pub(crate) identity: Option<Arc<dyn Identity>>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes, params: Pooled) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params,
            route: None,
            identity: None,
            extensions: parts.extensions,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Returns `None` for missing or non-visible-ASCII values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The pattern of the matched route, e.g. `/users/{id:number}`.
    ///
    /// `None` while middleware run: routing happens after them.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn identity(&self) -> Option<&dyn Identity> {
        self.identity.as_deref()
    }

    pub fn set_identity(&mut self, identity: impl Identity + 'static) {
        self.identity = Some(Arc::new(identity));
    }

    /// Request-scoped key-value store.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }
}

#[cfg(test)]
impl Request {
    pub(crate) fn for_test<B: Into<Bytes>>(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body.into(), crate::params::ParamsPool::new(4).acquire())
    }
}
