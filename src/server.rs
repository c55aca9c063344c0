//! HTTP server and graceful shutdown.
//!
//! On **SIGTERM** or Ctrl-C the server:
//! 1. stops accepting new connections,
//! 2. lets every in-flight connection task run to completion,
//! 3. returns from [`Server::serve`], so `main` can exit cleanly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use switchyard::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("localhost").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::Addr(addr.to_owned()))?;
        Ok(Self { addr })
    }

    /// Seals `router` and serves it until a shutdown signal arrives and
    /// every in-flight request has completed.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener, Arc::new(router.seal()), shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), on an already bound listener and with
    /// a caller-provided shutdown future.
    pub async fn serve_with(
        listener: TcpListener,
        dispatcher: Arc<Dispatcher>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr = listener.local_addr()?;
        Self { addr }.serve_on(listener, dispatcher, shutdown).await
    }

    async fn serve_on(
        self,
        listener: TcpListener,
        dispatcher: Arc<Dispatcher>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        info!(addr = %self.addr, "switchyard listening");

        // Every connection task lives here so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { serve_request(&dispatcher, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("switchyard stopped");
        Ok(())
    }
}

/// Buffers the request body and hands the request to the dispatcher.
///
/// Hyper never sees an error: an unreadable body is answered with `400`.
async fn serve_request(
    dispatcher: &Dispatcher,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(method = %parts.method, path = parts.uri.path(), "failed to read request body: {e}");
            let mut response = http::Response::new(Full::new(Bytes::from_static(b"Bad Request")));
            *response.status_mut() = http::StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };
    Ok(dispatcher.handle(http::Request::from_parts(parts, body)).await)
}

/// Resolves on the first SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
