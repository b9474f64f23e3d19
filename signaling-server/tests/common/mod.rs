#![allow(dead_code)]

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use voice_overlay_signaling::verify::GamertagLookup;
use voice_overlay_signaling::{serve, AppState, ServerError};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_lookup("http://127.0.0.1:9/profiles").await
    }

    pub async fn start_with_lookup(lookup_url: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let lookup = GamertagLookup::new(lookup_url, Duration::from_secs(2)).unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, AppState::new(lookup), async {
            let _ = rx.await;
        }));
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect(&self) -> WsStream {
        let (ws, _) = connect_async(format!("ws://{}/", self.addr)).await.unwrap();
        ws
    }

    /// Connect and claim `gamertag`, consuming the join replies.
    pub async fn join(&self, gamertag: &str) -> WsStream {
        let mut ws = self.connect().await;
        send_json(
            &mut ws,
            serde_json::json!({"type": "join", "data": {"gamertag": gamertag}}),
        )
        .await;
        recv_type(&mut ws, "participants").await;
        recv_type(&mut ws, "participants").await;
        ws
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        timeout(RECV_TIMEOUT, self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

pub async fn send_raw(ws: &mut WsStream, raw: &str) {
    ws.send(Message::Text(raw.to_string())).await.unwrap();
}

/// Next text frame, or None once the server closed the socket.
pub async fn next_text(ws: &mut WsStream) -> Option<String> {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame");
        match msg {
            Some(Ok(Message::Text(text))) => return Some(text),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

pub async fn recv_json(ws: &mut WsStream) -> Value {
    let text = next_text(ws).await.expect("connection closed");
    serde_json::from_str(&text).unwrap()
}

/// Skip frames until one of the given type arrives.
pub async fn recv_type(ws: &mut WsStream, ty: &str) -> Value {
    loop {
        let value = recv_json(ws).await;
        if value["type"] == ty {
            return value;
        }
    }
}

/// Stand-in for the public gamertag site: `Known` exists, `Broken` fails,
/// everything else is a 404.
pub async fn start_lookup_stub() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, Infallible>(service_fn(|req: Request<Body>| async move {
            let status = match req.uri().path() {
                "/profiles/Known" | "/profiles/Major%20Tom" => StatusCode::OK,
                "/profiles/Broken" => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::NOT_FOUND,
            };
            let mut resp = Response::new(Body::empty());
            *resp.status_mut() = status;
            Ok::<_, Infallible>(resp)
        }))
    });
    let server = Server::from_tcp(listener).unwrap().serve(make_svc);
    tokio::spawn(server);
    addr
}
