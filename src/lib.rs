//! # switchyard
//!
//! An embeddable HTTP router and dispatcher.
//!
//! - Segment trie per method: literals, `:id` / `{id}` / `{id:validator}`
//!   parameters, `(a|b)` alternation, trailing `*path` catch-alls.
//! - Global middleware that can annotate or short-circuit a request.
//! - Route-level permission sets checked against the caller's identity.
//! - One panic boundary per request: a crashing handler costs one `500` and
//!   one log line with the stack, never the process.
//! - Lazy gzip / deflate of compressible responses.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::{Abort, Request, Response, Router, Server, validator};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchyard::Error> {
//!     let app = Router::new()
//!         .validator("number", validator::number)
//!         .get("/users/{id:number}", get_user)
//!         .post("/users", create_user)
//!         .get("/assets/*", asset);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or_default();
//!     Response::json(format!(r#"{{"id":{id}}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, Abort> {
//!     if req.body().is_empty() {
//!         return Err(Abort::new(StatusCode::BAD_REQUEST, "empty body"));
//!     }
//!     Ok(Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .no_body())
//! }
//!
//! async fn asset(req: Request) -> String {
//!     format!("asset {}", req.param("path").unwrap_or("/"))
//! }
//! ```
//!
//! Embedding without the bundled server: [`Router::seal`] gives a
//! [`Dispatcher`] whose [`handle`](Dispatcher::handle) maps an
//! `http::Request<Bytes>` to an `http::Response`.

mod acl;
mod config;
mod dispatch;
mod error;
mod handler;
mod params;
mod pattern;
mod recover;
mod request;
mod response;
mod router;
mod server;
mod tree;
mod writer;

pub mod middleware;
pub mod validator;

pub use acl::{Identity, Principal};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Abort, Error, RouteError};
pub use handler::Handler;
pub use middleware::{Cors, Middleware};
pub use params::{Params, ParamsIter};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use validator::Validator;
pub use writer::{Encoding, ResponseWriter, is_compressible};
