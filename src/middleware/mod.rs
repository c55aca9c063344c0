//! Global middleware.
//!
//! Middleware run for every request, in registration order, before the
//! route lookup. Each one sees the request as `&mut Request` and answers:
//!
//! - `None`: carry on with the next middleware, then the route;
//! - `Some(response)`: stop here and send `response`. Later middleware and
//!   the route handler never run.
//!
//! Middleware may annotate the request (identity, extensions, headers). The
//! method and URI are restored after each call, so middleware cannot reroute
//! a request.
//!
//! A synchronous `fn(&mut Request) -> Option<Response>` is already a
//! middleware. Anything that needs to `.await` implements the trait:
//!
//! ```rust
//! use futures::future::BoxFuture;
//! use switchyard::{Principal, Request, Response};
//! use switchyard::middleware::Middleware;
//!
//! struct Sessions;
//!
//! impl Sessions {
//!     async fn lookup(&self, _token: &str) -> Option<Principal> { None }
//! }
//!
//! impl Middleware for Sessions {
//!     fn call<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Option<Response>> {
//!         Box::pin(async move {
//!             let token = req.header("authorization")?.to_owned();
//!             if let Some(principal) = self.lookup(&token).await {
//!                 req.set_identity(principal);
//!             }
//!             None
//!         })
//!     }
//! }
//! ```

mod cors;

use std::future;

use futures::future::BoxFuture;

use crate::request::Request;
use crate::response::Response;

pub use cors::Cors;

pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Option<Response>>;
}

impl<F> Middleware for F
where
    F: Fn(&mut Request) -> Option<Response> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: &'a mut Request) -> BoxFuture<'a, Option<Response>> {
        Box::pin(future::ready(self(req)))
    }
}

pub(crate) type BoxedMiddleware = Box<dyn Middleware>;
