//! Route registration.
//!
//! One segment trie per HTTP method. Build the [`Router`] once at startup,
//! then [`seal`](Router::seal) it into a [`Dispatcher`]: the tables are
//! frozen from that point on and shared read-only by every request.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::RouteError;
use crate::handler::{Handler, SharedEndpoint};
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::pattern;
use crate::tree::Node;
use crate::validator::Validators;

/// What a trie leaf holds.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) pattern: Arc<str>,
    pub(crate) permissions: Arc<[String]>,
    pub(crate) handler: SharedEndpoint,
}

/// The application router.
///
/// Each registration returns `self`, so calls chain:
///
/// ```rust
/// # use switchyard::{Request, Response, Router, validator};
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// # async fn asset(_: Request) -> Response { Response::text("") }
/// let dispatcher = Router::new()
///     .validator("number", validator::number)
///     .get("/users/{id:number}", get_user)
///     .post("/users", create_user)
///     .get("/assets/*path", asset)
///     .seal();
/// ```
///
/// Registration mistakes (two handlers at one position, a catch-all that is
/// not last, an unknown validator) panic in [`on`](Router::on) so a
/// misconfigured service never starts. Use [`try_on`](Router::try_on) to get
/// the [`RouteError`] back instead.
pub struct Router {
    trees: HashMap<Method, Node<Route>>,
    validators: Validators,
    middleware: Vec<BoxedMiddleware>,
    config: Config,
}

impl Router {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            validators: Validators::default(),
            middleware: Vec::new(),
            config: Config::default(),
        }
    }

    /// Registers a parameter validator, referenced from patterns as
    /// `{name:validator}`. Must come before the routes that use it.
    pub fn validator<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(name, predicate);
        self
    }

    /// Appends a global middleware. Middleware run in registration order.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Registers a public route.
    ///
    /// # Panics
    ///
    /// On any [`RouteError`].
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.try_on(method, pattern, handler).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Registers a route that only callers holding one of `permissions` may
    /// reach.
    ///
    /// # Panics
    ///
    /// On any [`RouteError`].
    pub fn secure<I, P>(self, method: Method, pattern: &str, permissions: I, handler: impl Handler) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.try_secure(method, pattern, permissions, handler).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_on(self, method: Method, pattern: &str, handler: impl Handler) -> Result<Self, RouteError> {
        self.add(method, pattern, Arc::from([]), handler.into_endpoint())
    }

    pub fn try_secure<I, P>(
        self,
        method: Method,
        pattern: &str,
        permissions: I,
        handler: impl Handler,
    ) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let permissions: Arc<[String]> = permissions.into_iter().map(Into::into).collect();
        self.add(method, pattern, permissions, handler.into_endpoint())
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, pattern, handler)
    }

    fn add(
        mut self,
        method: Method,
        pattern: &str,
        permissions: Arc<[String]>,
        handler: SharedEndpoint,
    ) -> Result<Self, RouteError> {
        let segments = pattern::compile(pattern)?;
        let route = Route { pattern: Arc::from(pattern), permissions, handler };

        debug!(%method, pattern, secured = !route.permissions.is_empty(), "registering route");
        self.trees
            .entry(method)
            .or_default()
            .insert(pattern, &segments, &self.validators, route)?;
        Ok(self)
    }

    /// Freezes the routing tables.
    pub fn seal(self) -> Dispatcher {
        debug!(
            methods = self.trees.len(),
            middleware = self.middleware.len(),
            "router sealed"
        );
        Dispatcher::new(self.trees, self.middleware, self.config)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
