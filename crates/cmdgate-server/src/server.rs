//! TCP server and per-connection driver

use crate::config::GatewayConfig;
use crate::request::{read_head, BAD_REQUEST};
use cmdgate_ws::{Backend, BackendError, ReplyReceiver, WsConnection};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, trace, warn};

/// Read buffer growth per readiness notification
const READ_CHUNK: usize = 16 * 1024;

/// Error type for the gateway server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Configured address
        addr: String,
        /// Underlying error
        source: io::Error,
    },

    /// The backend cannot serve the configured database
    #[error("Backend rejected database {database}: {source}")]
    Backend {
        /// Configured database
        database: u32,
        /// Underlying error
        source: BackendError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Listening gateway
pub struct Gateway {
    listener: TcpListener,
    backend: Arc<dyn Backend>,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    /// Bind the listening socket.
    ///
    /// Opens and releases one backend session on the configured database
    /// first, so a database the backend cannot serve fails here instead of
    /// on every connection.
    pub async fn bind(config: GatewayConfig, backend: Arc<dyn Backend>) -> Result<Self, ServerError> {
        let mut session = backend
            .connect(config.database)
            .await
            .map_err(|source| ServerError::Backend {
                database: config.database,
                source,
            })?;
        session.release().await;

        let listener = TcpListener::bind(&config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind.clone(),
                source,
            })?;
        Ok(Self {
            listener,
            backend,
            config: Arc::new(config),
        })
    }

    /// Address the gateway is listening on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process ends
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `signal` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!("cmdgate listening on ws://{}", addr);

        tokio::pin!(signal);
        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!(error = %err, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let backend = self.backend.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, backend, config).await;
            });
        }
    }
}

/// Resolve once `signal` fires.
///
/// If the signal listener could not be installed the error is logged and
/// the future never resolves, so the gateway keeps serving.
pub async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Run one client connection from request head to teardown
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    backend: Arc<dyn Backend>,
    config: Arc<GatewayConfig>,
) {
    if let Err(err) = stream.set_nodelay(true) {
        debug!(%peer, error = %err, "Failed to set TCP_NODELAY");
    }

    let (head, rest) = match read_head(&mut stream, config.max_request_head).await {
        Ok(read) => read,
        Err(err) => {
            debug!(%peer, error = %err, "Dropping connection before upgrade");
            return;
        }
    };

    if !head.is_upgrade() {
        debug!(%peer, method = %head.method, path = %head.path, "Rejecting non-upgrade request");
        let _ = stream.write_all(BAD_REQUEST).await;
        return;
    }

    let request = head.into_handshake();
    let (mut conn, mut replies) = match WsConnection::upgrade(&request, backend, &config.ws_config()) {
        Ok(upgraded) => upgraded,
        Err(err) => {
            warn!(%peer, path = %request.path, error = %err, "Refusing WebSocket upgrade");
            let _ = stream.write_all(BAD_REQUEST).await;
            return;
        }
    };
    conn.input_mut().extend(&rest);
    info!(%peer, path = %conn.path(), "WebSocket connection established");

    let result = drive(&stream, &mut conn, &mut replies).await;
    conn.close();
    match result {
        Ok(()) => info!(%peer, messages = conn.messages(), "WebSocket connection closed"),
        Err(err) => warn!(%peer, error = %err, "WebSocket connection failed"),
    }
}

/// Pump readiness events into the connection until EOF or a fatal error
async fn drive(
    stream: &TcpStream,
    conn: &mut WsConnection,
    replies: &mut ReplyReceiver,
) -> cmdgate_ws::Result<()> {
    // Frames may have arrived together with the request head.
    conn.process_input()?;

    loop {
        tokio::select! {
            readable = stream.readable() => {
                readable?;
                let input = conn.input_mut().as_bytes_mut();
                input.reserve(READ_CHUNK);
                match stream.try_read_buf(input) {
                    Ok(0) => return Ok(()),
                    Ok(read) => {
                        trace!(read, "Read from socket");
                        conn.process_input()?;
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                    Err(err) => return Err(err.into()),
                }
            }
            Some(reply) = replies.recv() => {
                if let Err(err) = conn.send_reply(&reply) {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(error = %err, "Dropped reply");
                }
            }
            writable = stream.writable(), if conn.wants_write() => {
                writable?;
                conn.on_writable(&mut &*stream)?;
            }
        }
    }
}
