use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, Service};
use crate::routing::router::Router;

pub async fn run(cfg: &Config, router: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, Arc::new(Service::from_config(cfg, router))).await
}

/// Accepts connections forever. Each connection is served on its own
/// blocking worker; requests on it are handled one at a time.
pub async fn serve(listener: TcpListener, service: Arc<Service>) -> anyhow::Result<()> {
    let local_port = listener.local_addr()?.port();

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let socket = socket.into_std()?;
        socket.set_nonblocking(false)?;
        let output = socket.try_clone()?;

        let service = Arc::clone(&service);
        tokio::task::spawn_blocking(move || {
            let mut conn =
                Connection::new(socket, output, Some(peer), service).with_local("http", local_port);
            if let Err(e) = conn.run() {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
