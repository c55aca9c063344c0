use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use switchyard::{Dispatcher, Request, Router, validator};

async fn echo(req: Request) -> String {
    let params: Vec<String> = req.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}|{}", req.route().unwrap_or_default(), params.join(","))
}

fn app() -> Dispatcher {
    Router::new()
        .validator("number", validator::number)
        .get("/", echo)
        .get("/users", echo)
        .get("/users/new", echo)
        .get("/user/{id:number}", echo)
        .get("/assets/*", echo)
        .get("/files/*rest", echo)
        .get("/(repos|repo)/:id", echo)
        .post("/users", echo)
        .seal()
}

async fn call(dispatcher: &Dispatcher, method: Method, uri: &str) -> (StatusCode, String) {
    let req = http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
    let response = dispatcher.handle(req).await;
    let status = response.status();
    (status, text(response).await)
}

async fn text(response: http::Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn literal_routes_match_exactly() {
    let app = app();
    assert_eq!(call(&app, Method::GET, "/users").await, (StatusCode::OK, "/users|".into()));
    assert_eq!(call(&app, Method::GET, "/users/new").await, (StatusCode::OK, "/users/new|".into()));
    assert_eq!(call(&app, Method::GET, "/users/new/extra").await.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, Method::GET, "/user").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validated_parameters() {
    let app = app();
    assert_eq!(
        call(&app, Method::GET, "/user/123").await,
        (StatusCode::OK, "/user/{id:number}|id=123".into())
    );
    assert_eq!(call(&app, Method::GET, "/user/12a").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catch_all_keeps_the_leading_slash() {
    let app = app();
    assert_eq!(
        call(&app, Method::GET, "/assets/js/a.js").await,
        (StatusCode::OK, "/assets/*|path=/js/a.js".into())
    );
    assert_eq!(
        call(&app, Method::GET, "/files/a/b/c.txt").await,
        (StatusCode::OK, "/files/*rest|rest=/a/b/c.txt".into())
    );
}

#[tokio::test]
async fn grouped_alternatives_share_the_handler() {
    let app = app();
    for path in ["/repos/42", "/repo/42"] {
        assert_eq!(
            call(&app, Method::GET, path).await,
            (StatusCode::OK, "/(repos|repo)/:id|id=42".into())
        );
    }
    assert_eq!(call(&app, Method::GET, "/rep/42").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_matches_only_itself() {
    let app = app();
    assert_eq!(call(&app, Method::GET, "/").await, (StatusCode::OK, "/|".into()));
    assert_eq!(call(&app, Method::GET, "/x").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_methods_get_405() {
    let app = app();
    let req = http::Request::builder().method(Method::DELETE).uri("/users").body(Bytes::new()).unwrap();
    let response = app.handle(req).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[http::header::ALLOW], "GET, HEAD, POST");
}

#[test]
#[should_panic(expected = "conflicts")]
fn duplicate_routes_fail_at_startup() {
    let _ = Router::new().get("/(a|b)", echo).get("/b", echo);
}

#[test]
fn same_pattern_for_two_methods_is_fine() {
    let app = Router::new().get("/items/:id", echo).put("/items/:id", echo).seal();
    assert!(app.lookup(&Method::GET, "/items/1").is_some());
    assert!(app.lookup(&Method::PUT, "/items/1").is_some());
}
