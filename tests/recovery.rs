use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use switchyard::{Abort, Config, Request, Response, Router};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Collects the fields of every `ERROR` event.
#[derive(Clone, Default)]
struct Errors(Arc<Mutex<Vec<HashMap<String, String>>>>);

impl<S: Subscriber> Layer<S> for Errors {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.0.lock().unwrap().push(fields.0);
    }
}

#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }
}

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::builder().method(Method::GET).uri(uri).body(Bytes::new()).unwrap()
}

async fn body(response: http::Response<http_body_util::Full<Bytes>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn explode(req: Request) -> Response {
    let items: Vec<u32> = Vec::new();
    let index: usize = req.param("n").and_then(|n| n.parse().ok()).unwrap_or(3);
    Response::text(items[index].to_string())
}

async fn ok(_: Request) -> &'static str {
    "still here"
}

#[tokio::test]
async fn panic_yields_one_500_and_one_stack_log() {
    let errors = Errors::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(errors.clone()));

    let app = Router::new().get("/boom/:n", explode).get("/ok", ok).seal();

    let response = app.handle(get("/boom/3")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(response).await, "Internal Server Error");

    {
        let errors = errors.0.lock().unwrap();
        assert_eq!(errors.len(), 1);
        let event = &errors[0];
        assert_eq!(event["path"], "/boom/3");
        assert_eq!(event["method"], "GET");
        assert!(event["panic"].contains("index out of bounds"));
        assert!(!event["backtrace"].is_empty());
        assert_ne!(event["backtrace"], "<unavailable>");
    }

    let response = app.handle(get("/ok")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "still here");
    assert_eq!(errors.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn debug_mode_shows_the_panic_message() {
    let app = Router::new()
        .config(Config::default().debug(true))
        .get("/boom", |_: Request| async {
            if true {
                panic!("cache not warmed");
            }
            "unreachable"
        })
        .seal();

    let response = app.handle(get("/boom")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(response).await, "panic: cache not warmed");
}

#[tokio::test]
async fn aborts_render_their_status_without_logging() {
    let errors = Errors::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(errors.clone()));

    let app = Router::new()
        .get("/returned", |_: Request| async {
            Err::<Response, _>(Abort::new(StatusCode::CONFLICT, "name taken"))
        })
        .get("/raised", |_: Request| async {
            if true {
                Abort::new(StatusCode::TOO_MANY_REQUESTS, "slow down").raise();
            }
            "unreachable"
        })
        .seal();

    let response = app.handle(get("/returned")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body(response).await, "name taken");

    let response = app.handle(get("/raised")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body(response).await, "slow down");

    assert!(errors.0.lock().unwrap().is_empty());
}
