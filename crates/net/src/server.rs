//! TCP server for the booking service
//!
//! Connections are read on tokio tasks; each request is then handed to a
//! blocking worker with its own database connection.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::handler::Handler;
use crate::protocol::{Request, Response};

/// Server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Prepare the database and start listening on `addr`
    pub async fn start(addr: SocketAddr, handler: Handler) -> Result<Self> {
        let setup = handler.clone();
        tokio::task::spawn_blocking(move || setup.prepare())
            .await
            .map_err(|e| Error::Protocol(format!("Setup task failed: {}", e)))??;

        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, handler, shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    handler: Handler,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(stream, addr, handler.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Serve requests on one connection until the peer hangs up
async fn handle_connection(mut stream: TcpStream, addr: SocketAddr, handler: Handler) {
    loop {
        let request: Request = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(Error::ConnectionClosed) => {
                debug!(addr = %addr, "Connection closed");
                break;
            }
            Err(Error::Protocol(reason)) => {
                // Tell the peer, then drop it; the stream may be out of sync
                warn!(addr = %addr, reason = %reason, "Bad request frame");
                let response = Response::Error {
                    kind: counselbook_core::ErrorKind::Validation,
                    message: reason,
                };
                let _ = write_frame(&mut stream, &response).await;
                break;
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Read error");
                break;
            }
        };

        let worker = handler.clone();
        let response = match tokio::task::spawn_blocking(move || worker.handle(request)).await {
            Ok(response) => response,
            Err(e) => {
                error!(addr = %addr, error = %e, "Request worker failed");
                Response::Error {
                    kind: counselbook_core::ErrorKind::Storage,
                    message: "request worker failed".to_string(),
                }
            }
        };

        if let Err(e) = write_frame(&mut stream, &response).await {
            debug!(addr = %addr, error = %e, "Write failed");
            break;
        }
    }
}
