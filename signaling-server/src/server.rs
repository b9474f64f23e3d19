use std::future::Future;
use std::net::TcpListener;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::{error, info};

use crate::config::Config;
use crate::error::ServerError;
use crate::http::handle_request;
use crate::state::AppState;
use crate::verify::GamertagLookup;

const SHUTDOWN_MESSAGE: &str = "Server is shutting down";

/// Serve HTTP and WebSocket traffic on `listener` until `shutdown` resolves.
/// Sessions are told about the shutdown and closed before the listener is
/// released.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let svc_state = state.clone();
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let state = svc_state.clone();
        let remote_addr = conn.remote_addr();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                handle_request(req, state.clone(), remote_addr)
            }))
        }
    });

    let server = Server::from_tcp(listener)?.serve(make_svc);

    info!("Signaling server listening on http://{}", addr);
    info!("WebSocket endpoint: ws://{}", addr);
    info!("Game state ingest: http://{}/api/game-state", addr);
    info!("Health check: http://{}/health", addr);

    server
        .with_graceful_shutdown(async move {
            shutdown.await;
            let closed = state.shutdown(SHUTDOWN_MESSAGE).await;
            info!("Shutdown requested; closed {} sessions", closed);
        })
        .await?;

    info!("Signaling server on {} stopped", addr);
    Ok(())
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let lookup = GamertagLookup::new(&config.lookup_url, config.lookup_timeout)?;
    let listener = TcpListener::bind(config.addr)?;
    serve(listener, AppState::new(lookup), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
