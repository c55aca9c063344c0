//! CORS preflight answering.
//!
//! ```rust
//! use switchyard::{Cors, Router};
//!
//! let router = Router::new().middleware(
//!     Cors::new()
//!         .allow_origin("https://app.example.com")
//!         .allow_methods(["GET", "POST", "DELETE"])
//!         .max_age(600),
//! );
//! ```

use std::collections::BTreeSet;

use futures::future::BoxFuture;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use tracing::debug;

use super::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Answers `OPTIONS` preflight requests with `204 No Content`.
///
/// A request counts as a preflight when it is `OPTIONS` and carries both
/// `Origin` and `Access-Control-Request-Method`. Every other request passes
/// through untouched. A preflight from an origin that is not allowed still
/// gets its `204`, without any `Access-Control-Allow-*` header, which is
/// how the browser learns it was refused.
#[derive(Clone, Debug)]
pub struct Cors {
    origins: Option<BTreeSet<String>>,
    methods: Vec<String>,
    headers: Option<Vec<String>>,
    max_age: Option<u64>,
    credentials: bool,
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}

impl Cors {
    /// Any origin, the common methods, the requested headers echoed back.
    pub fn new() -> Self {
        Self {
            origins: None,
            methods: ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE"].map(str::to_owned).to_vec(),
            headers: None,
            max_age: None,
            credentials: false,
        }
    }

    /// Restricts preflights to the listed origins. May be called repeatedly.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.get_or_insert_with(BTreeSet::new).insert(origin.into());
        self
    }

    pub fn allow_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.methods = methods.into_iter().map(|m| m.into().to_ascii_uppercase()).collect();
        self
    }

    /// Fixes the allowed request headers instead of echoing what the
    /// preflight asked for.
    pub fn allow_headers<I, H>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn allow_credentials(mut self, on: bool) -> Self {
        self.credentials = on;
        self
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.origins.as_ref().is_none_or(|origins| origins.contains(origin))
    }

    fn preflight(&self, req: &Request) -> Option<Response> {
        if *req.method() != Method::OPTIONS {
            return None;
        }
        let origin = req.header("origin")?;
        let requested = req.header("access-control-request-method")?;

        let mut builder = Response::builder().status(StatusCode::NO_CONTENT);
        let method_allowed = self.methods.iter().any(|m| m.eq_ignore_ascii_case(requested));
        if !self.origin_allowed(origin) || !method_allowed {
            debug!(origin, method = requested, "cors preflight refused");
            return Some(builder.no_body());
        }

        let allow_origin = if self.origins.is_none() && !self.credentials { "*" } else { origin };
        builder = builder
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin)
            .header(header::ACCESS_CONTROL_ALLOW_METHODS, self.methods.join(", "));

        let allow_headers = match &self.headers {
            Some(headers) => Some(headers.join(", ")),
            None => req.header("access-control-request-headers").map(str::to_owned),
        };
        if let Some(allow_headers) = allow_headers {
            builder = builder.header(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
        }
        if let Some(max_age) = self.max_age {
            builder = builder.header(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }
        if self.credentials {
            builder = builder.header(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if allow_origin != "*" {
            builder = builder.header(header::VARY, HeaderValue::from_static("origin"));
        }
        Some(builder.no_body())
    }
}

impl Middleware for Cors {
    fn call<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Option<Response>> {
        Box::pin(std::future::ready(self.preflight(req)))
    }
}
