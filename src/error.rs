//! Error types.
//!
//! Three channels, never mixed:
//!
//! - [`RouteError`]: registration-time misconfiguration. Surfaces while the
//!   router is being built and is meant to stop the process before it serves
//!   a single request.
//! - [`Abort`]: a request-scoped "stop here and answer with this status".
//!   Handlers return it as `Err(Abort)`; middleware answer with
//!   `Some(abort.into_response())`.
//! - [`Error`]: infrastructure failures of the serving loop (bind, accept).

use std::any::Any;
use std::panic;

use http::StatusCode;
use thiserror::Error;

use crate::response::{IntoResponse, Response};

/// The error type returned by the fallible serving operations.
///
/// Application-level failures (404, 403, etc.) are expressed as HTTP
/// [`Response`] values, not as `Error`s.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// A route could not be registered.
///
/// Every variant is a configuration mistake. [`Router::on`](crate::Router::on)
/// panics with it; [`Router::try_on`](crate::Router::try_on) hands it back.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RouteError {
    /// A handle is already bound at this tree position, or a second
    /// catch-all was declared under the same node.
    #[error("route `{pattern}` conflicts with a previously registered route")]
    Conflict { pattern: String },

    /// A catch-all segment was followed by more segments.
    #[error("route `{pattern}`: catch-all segments are only allowed at the end of a route")]
    InvalidCatchAll { pattern: String },

    /// A `{name:validator}` parameter named a validator nobody registered.
    #[error("route `{pattern}`: unknown validator `{validator}`")]
    UnknownValidator { pattern: String, validator: String },

    /// The pattern text itself is malformed.
    #[error("route `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}

/// An intentional abort carrying the status and message to answer with.
///
/// ```rust
/// use switchyard::{Abort, Request, Response};
/// use http::StatusCode;
///
/// async fn get_invoice(req: Request) -> Result<Response, Abort> {
///     let id = req.param("id").unwrap_or_default();
///     if id.len() > 12 {
///         return Err(Abort::new(StatusCode::BAD_REQUEST, "invoice id too long"));
///     }
///     Ok(Response::text(format!("invoice {id}")))
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{status}: {message}")]
pub struct Abort {
    pub status: StatusCode,
    pub message: String,
}

impl Abort {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Abort with the status' canonical reason phrase as the message.
    pub fn status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    /// Unwinds the current request with this abort.
    ///
    /// For library code buried too deep to return a `Result`. The recovery
    /// boundary renders it exactly like a returned `Err(Abort)` and does not
    /// treat it as a crash.
    pub fn raise(self) -> ! {
        panic::panic_any(self)
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Option<&Abort> {
        payload.downcast_ref::<Abort>()
    }
}

impl IntoResponse for Abort {
    fn into_response(self) -> Response {
        Response::builder().status(self.status).text(self.message)
    }
}
