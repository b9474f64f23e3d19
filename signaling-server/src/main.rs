use log::error;

use voice_overlay_signaling::{run, Config};

#[tokio::main]
async fn main() {
    // Healthcheck mode: exit 0 if server is running (port in use), exit 1 if not
    if std::env::args().any(|a| a == "--healthcheck") {
        use std::net::TcpListener;
        let port = Config::from_env().addr.port();
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => std::process::exit(1), // Port free = server NOT running
            Err(_) => std::process::exit(0), // Port in use = server IS running (healthy)
        }
    }

    env_logger::init();

    if let Err(e) = run(Config::from_env()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
