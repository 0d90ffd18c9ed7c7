use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpSocket;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::cache::ContentCache;
use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::server::signals;
use crate::server::transport::Transport;

const LISTEN_BACKLOG: u32 = 10;

/// Accept loop. Before each accept it honors a pending reload request by
/// rebuilding the content cache; each accepted connection is handed to a
/// detached worker task (which also runs the TLS handshake, so a slow or
/// failing handshake never stalls the loop).
///
/// Returns only on error; a failed reload terminates the loop rather than
/// keep serving a tree that no longer matches the disk.
pub async fn run(
    config: &ServerConfig,
    cache: Arc<ContentCache>,
    tls: Option<TlsAcceptor>,
) -> Result<()> {
    let addr = config.socket_addr()?;
    let socket = TcpSocket::new_v4().context("failed to create listening socket")?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    let listener = socket
        .listen(LISTEN_BACKLOG)
        .with_context(|| format!("failed to listen on {addr}"))?;
    info!("server listening on {addr}");

    let extra_headers: Arc<str> = Arc::from(config.extra_headers.as_str());

    loop {
        if signals::take_reload_request() {
            let count = cache
                .load(&config.html_root)
                .await
                .context("cache reload failed")?;
            info!(files = count, "content cache reloaded");
        }

        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("accept failed: {e}");
                continue;
            }
        };
        debug!("accepted connection from {peer}");

        let cache = Arc::clone(&cache);
        let extra_headers = Arc::clone(&extra_headers);
        match tls.clone() {
            Some(acceptor) => {
                tokio::spawn(async move {
                    let stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!("ssl handshake with {peer} failed: {e}");
                            return;
                        }
                    };
                    serve(stream, cache, extra_headers, peer).await;
                });
            }
            None => {
                tokio::spawn(async move {
                    serve(stream, cache, extra_headers, peer).await;
                });
            }
        }
    }
}

async fn serve<S>(
    stream: S,
    cache: Arc<ContentCache>,
    extra_headers: Arc<str>,
    peer: std::net::SocketAddr,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut connection = Connection::new(Transport::new(stream), cache, extra_headers);
    if let Err(e) = connection.run().await {
        error!("error sending to client {peer}: {e}");
    }
}
