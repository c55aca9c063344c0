//! Per-request panic boundary.
//!
//! Two kinds of unwinding reach this boundary:
//!
//! - an [`Abort`] raised with [`Abort::raise`]: rendered as its status and
//!   message, no stack captured;
//! - anything else is a bug: the stack at the panic site is logged once and
//!   the client gets a `500` that does not leak the panic message (unless
//!   debug mode is on).
//!
//! The stack has to be captured while the panicking frame is still alive, so
//! a panic hook is installed once per process. Inside a boundary it stores a
//! backtrace in a thread-local slot and keeps quiet; outside, it defers to
//! whatever hook was installed before.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::{self, Future};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::sync::Once;
use std::thread;

use futures::FutureExt;
use http::{Method, StatusCode};
use tracing::{error, warn};

use crate::error::Abort;
use crate::response::{IntoResponse, Response};
use crate::writer::ResponseWriter;

const SAFE_MESSAGE: &str = "Internal Server Error";

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !GUARDED.with(Cell::get) {
                previous(info);
                return;
            }
            if info.payload().downcast_ref::<Abort>().is_none() {
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            }
        }));
    });
}

/// Marks the current thread as inside a boundary for the length of one poll.
struct Scope {
    previous: bool,
}

impl Scope {
    fn enter() -> Self {
        Self { previous: GUARDED.with(|g| g.replace(true)) }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        GUARDED.with(|g| g.set(self.previous));
    }
}

/// Drives `fut` to completion, catching any panic it raises.
pub(crate) async fn catch<F: Future>(fut: F) -> thread::Result<F::Output> {
    install_hook();
    CAPTURED.with(|slot| slot.borrow_mut().take());
    let mut fut = pin!(fut);
    let guarded = future::poll_fn(move |cx| {
        let _scope = Scope::enter();
        fut.as_mut().poll(cx)
    });
    AssertUnwindSafe(guarded).catch_unwind().await
}

/// Turns a caught panic into the request's response.
///
/// If the response was already committed the status can no longer change;
/// the failure is only logged.
pub(crate) fn recover(
    payload: Box<dyn Any + Send>,
    writer: &mut ResponseWriter,
    debug: bool,
    method: &Method,
    path: &str,
) {
    let backtrace = CAPTURED.with(|slot| slot.borrow_mut().take());

    if let Some(abort) = Abort::from_panic(&*payload) {
        if writer.is_committed() {
            warn!(%method, path, status = %abort.status, "abort raised after the response was committed");
            return;
        }
        render(writer, abort.clone().into_response());
        return;
    }

    let message = panic_message(&*payload);
    let backtrace = backtrace.map_or_else(|| "<unavailable>".to_owned(), |bt| bt.to_string());
    error!(
        %method,
        path,
        panic = %message,
        committed = writer.is_committed(),
        backtrace = %backtrace,
        "handler panicked"
    );

    if writer.is_committed() {
        return;
    }
    let body = if debug { format!("panic: {message}") } else { SAFE_MESSAGE.to_owned() };
    render(writer, Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).text(body));
}

fn render(writer: &mut ResponseWriter, response: Response) {
    if let Err(e) = writer.render(response) {
        error!("failed to write error response: {e}");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
