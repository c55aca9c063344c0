//! Route handlers.
//!
//! A trie leaf stores an [`Endpoint`] behind an `Arc`: grouped patterns such
//! as `/(repos|repo)/:id` put one handler under several leaves, and every
//! leaf of every method tree shares the same concrete type.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The object-safe form of a handler, as stored in the trie.
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Anything that can answer a routed request.
///
/// Satisfied by every `async fn(Request) -> impl IntoResponse` and by
/// closures of the same shape. It cannot be implemented by hand.
///
/// Return `Result<T, Abort>` to stop with a specific status:
/// `Err(Abort::new(StatusCode::CONFLICT, "name taken"))`.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(Func(self))
    }
}

struct Func<F>(F);

impl<F, Fut, R> Endpoint for Func<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.0)(req).map(IntoResponse::into_response).boxed()
    }
}
