use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hyper_tungstenite::tungstenite::Message;
use log::{error, info};
use tokio::sync::mpsc;

use crate::router::{self, Disposition};
use crate::state::{AppState, ConnId};

/// How long queued frames (e.g. a join rejection) get to reach the socket
/// before the writer task is aborted.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle_connection(
    ws: hyper_tungstenite::WebSocketStream<hyper::upgrade::Upgraded>,
    addr: SocketAddr,
    state: AppState,
) {
    let (mut ws_sender, mut ws_receiver) = ws.split();
    let conn_id: ConnId = uuid::Uuid::new_v4().to_string();
    info!("WebSocket connection {} established from {}", conn_id, addr);

    // Every outbound frame for this socket goes through this channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.hub.lock().await.connect(conn_id.clone(), tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });
    let mut send_finished = false;

    loop {
        tokio::select! {
            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        let disposition = {
                            let mut hub = state.hub.lock().await;
                            router::handle_message(&mut hub, &conn_id, &tx, &text)
                        };
                        if disposition == Disposition::Close {
                            let _ = tx.send(Message::Close(None));
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} ({}) closed connection", conn_id, addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {} ({}): {}", conn_id, addr, e);
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut send_task => {
                send_finished = true;
                break;
            }
        }
    }

    // Clean up when connection closes. The hub holds a sender clone, so it
    // must be released before the writer can see the channel end.
    {
        let mut hub = state.hub.lock().await;
        router::handle_disconnect(&mut hub, &conn_id);
        hub.release(&conn_id);
    }

    drop(tx);
    if !send_finished && tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    info!("Connection {} from {} finished", conn_id, addr);
}
