//! Per-request dispatch.
//!
//! Every request walks the same states and leaves with exactly one
//! response:
//!
//! ```text
//! received ─▶ middleware[0..n] ─┬─▶ short-circuit ──────────────┐
//!                               └─▶ route match ─┬─▶ 404 / 405 ─┤
//!                                                └─▶ acl ─┬─▶ 401 / 403
//!                                                         └─▶ handler ─▶ responded
//! ```
//!
//! The whole walk runs inside one panic boundary. A panic anywhere in it is
//! turned into a response, the pooled params go back to the pool as the
//! request unwinds, and the connection keeps serving.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use tracing::{debug, error, info};

use crate::acl;
use crate::config::Config;
use crate::error::Abort;
use crate::middleware::BoxedMiddleware;
use crate::params::{Params, ParamsPool};
use crate::pattern;
use crate::recover;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Route;
use crate::tree::Node;
use crate::writer::ResponseWriter;

/// A sealed router, ready to serve.
///
/// Immutable and `Send + Sync`; share it behind an [`Arc`] across
/// connection tasks. Obtained from [`Router::seal`](crate::Router::seal).
pub struct Dispatcher {
    trees: HashMap<Method, Node<Route>>,
    middleware: Vec<BoxedMiddleware>,
    config: Config,
    pool: ParamsPool,
}

impl Dispatcher {
    pub(crate) fn new(trees: HashMap<Method, Node<Route>>, middleware: Vec<BoxedMiddleware>, config: Config) -> Self {
        let pool = ParamsPool::new(config.params_capacity);
        Self { trees, middleware, config, pool }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves one request.
    ///
    /// Never fails: routing misses, access denials, aborts and panics all
    /// come back as responses.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let mut writer = ResponseWriter::for_request(&method, req.headers(), self.config.compression);

        if let Err(payload) = recover::catch(self.run(req, &mut writer)).await {
            recover::recover(payload, &mut writer, self.config.debug, &method, &path);
        }

        let status = writer.status().unwrap_or(StatusCode::OK);
        let bytes = writer.bytes_written();
        let response = writer.close().unwrap_or_else(|e| {
            error!(%method, path, "failed to finish response body: {e}");
            let mut fallback = http::Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        });

        info!(
            target: "switchyard::access",
            %method,
            path,
            status = status.as_u16(),
            bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
        response
    }

    /// Resolves `path` against the `method` tree without running anything.
    ///
    /// Returns the matched route pattern and the bound parameters.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&str, Params)> {
        let mut params = Params::with_capacity(self.config.params_capacity);
        let route = self.trees.get(method)?.at(pattern::normalize(path), &mut params)?;
        Some((&route.pattern, params))
    }

    async fn run(&self, req: http::Request<Bytes>, writer: &mut ResponseWriter) {
        let response = self.respond(req).await;
        if let Err(e) = writer.render(response) {
            error!("failed to write response: {e}");
        }
    }

    async fn respond(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let mut req = Request::new(parts, body, self.pool.acquire());

        for middleware in &self.middleware {
            let method = req.method.clone();
            let uri = req.uri.clone();
            let outcome = middleware.call(&mut req).await;
            req.method = method;
            req.uri = uri;
            if let Some(response) = outcome {
                return response;
            }
        }

        let path = pattern::normalize(req.uri.path());
        let route = match self.find(&req.method, path, &mut req.params) {
            Ok(route) => route,
            Err(response) => return response,
        };

        if let Err(denied) = acl::authorize(&route.permissions, req.identity()) {
            debug!(method = %req.method, route = %route.pattern, ?denied, "access denied");
            return Abort::status(denied.status(self.config.deny_status)).into_response();
        }

        req.route = Some(Arc::clone(&route.pattern));
        route.handler.call(req).await
    }

    /// Finds the route for `method` + `path`, or the 404 / 405 to answer
    /// with.
    fn find(&self, method: &Method, path: &str, params: &mut Params) -> Result<&Route, Response> {
        if let Some(route) = self.trees.get(method).and_then(|tree| tree.at(path, params)) {
            return Ok(route);
        }
        if *method == Method::HEAD {
            params.clear();
            if let Some(route) = self.trees.get(&Method::GET).and_then(|tree| tree.at(path, params)) {
                return Ok(route);
            }
        }
        params.clear();

        let allowed = self.allowed(method, path, params);
        if allowed.is_empty() {
            return Err(Abort::status(StatusCode::NOT_FOUND).into_response());
        }

        let mut response = Abort::status(StatusCode::METHOD_NOT_ALLOWED).into_response();
        if let Ok(allow) = HeaderValue::from_str(&allowed.join(", ")) {
            response.headers_mut().insert(header::ALLOW, allow);
        }
        Err(response)
    }

    /// Methods whose tree matches `path`, sorted.
    fn allowed(&self, method: &Method, path: &str, scratch: &mut Params) -> Vec<&str> {
        let mut allowed = Vec::new();
        for (other, tree) in &self.trees {
            if other == method {
                continue;
            }
            let matched = tree.at(path, scratch).is_some();
            scratch.clear();
            if !matched {
                continue;
            }
            allowed.push(other.as_str());
            if *other == Method::GET && !self.trees.contains_key(&Method::HEAD) {
                allowed.push("HEAD");
            }
        }
        allowed.sort_unstable();
        allowed.dedup();
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use crate::validator;

    async fn body_of(response: http::Response<Full<Bytes>>) -> Bytes {
        use http_body_util::BodyExt;
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn request(method: Method, uri: &str) -> http::Request<Bytes> {
        http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    async fn route_name(req: Request) -> String {
        format!("{} {:?}", req.route().unwrap_or("-"), req.params())
    }

    #[tokio::test]
    async fn trailing_slashes_are_trimmed() {
        let dispatcher = Router::new().get("/users", route_name).seal();
        let response = dispatcher.handle(request(Method::GET, "/users///")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "/users []");
    }

    #[tokio::test]
    async fn wrong_method_lists_allowed_ones() {
        let dispatcher = Router::new()
            .get("/users/:id", route_name)
            .delete("/users/:id", route_name)
            .post("/users", route_name)
            .seal();

        let response = dispatcher.handle(request(Method::PUT, "/users/7")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "DELETE, GET, HEAD");

        let response = dispatcher.handle(request(Method::PUT, "/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "Not Found");
    }

    #[tokio::test]
    async fn head_falls_back_to_get() {
        let dispatcher = Router::new().get("/ping", |_: Request| async { "pong-body" }).seal();
        let response = dispatcher.handle(request(Method::HEAD, "/ping")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert!(body_of(response).await.is_empty());

        let response = dispatcher.handle(request(Method::GET, "/ping")).await;
        assert_eq!(body_of(response).await, "pong-body");
    }

    #[tokio::test]
    async fn middleware_cannot_reroute() {
        let dispatcher = Router::new()
            .middleware(|req: &mut Request| -> Option<Response> {
                req.uri = "/admin".parse().unwrap();
                req.method = Method::DELETE;
                req.extensions_mut().insert(7u32);
                None
            })
            .get("/public", |req: Request| async move {
                format!("{} {:?}", req.path(), req.extensions().get::<u32>())
            })
            .delete("/admin", route_name)
            .seal();

        let response = dispatcher.handle(request(Method::GET, "/public")).await;
        assert_eq!(body_of(response).await, "/public Some(7)");
    }

    #[tokio::test]
    async fn params_return_to_the_pool() {
        let dispatcher = Router::new()
            .validator("number", validator::number)
            .get("/user/{id:number}", route_name)
            .seal();

        let response = dispatcher.handle(request(Method::GET, "/user/42")).await;
        assert_eq!(body_of(response).await, r#"/user/{id:number} [("id", "42")]"#);
        assert_eq!(dispatcher.pool.idle(), 1);

        dispatcher.handle(request(Method::GET, "/user/43")).await;
        assert_eq!(dispatcher.pool.idle(), 1);
    }

    #[tokio::test]
    async fn params_return_to_the_pool_after_a_panic() {
        let dispatcher = Router::new()
            .get("/boom/:n", |req: Request| async move {
                if req.param("n").is_some() {
                    panic!("handler failed");
                }
                "unreachable"
            })
            .seal();

        let response = dispatcher.handle(request(Method::GET, "/boom/3")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(dispatcher.pool.idle(), 1);
    }

    #[test]
    fn lookup_reports_pattern_and_params() {
        let dispatcher = Router::new().get("/assets/*", route_name).seal();
        let (pattern, params) = dispatcher.lookup(&Method::GET, "/assets/js/a.js").unwrap();
        assert_eq!(pattern, "/assets/*");
        assert_eq!(params.get("path"), Some("/js/a.js"));
    }
}
