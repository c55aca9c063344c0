use std::sync::Arc;

use switchyard::{Request, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn greet(req: Request) -> String {
    format!("hello {} ({} bytes)", req.param("name").unwrap_or("?"), req.body().len())
}

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dispatcher = Arc::new(Router::new().post("/greet/:name", greet).seal());
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(Server::serve_with(listener, dispatcher, async {
        let _ = stopped.await;
    }));

    let response = roundtrip(
        addr,
        "POST /greet/ada HTTP/1.1\r\nhost: localhost\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("hello ada (5 bytes)"), "{response}");

    let response = roundtrip(addr, "GET /missing HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[test]
fn bind_rejects_bad_addresses() {
    assert!(matches!(Server::bind("not an address"), Err(switchyard::Error::Addr(_))));
}
