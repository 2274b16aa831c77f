//! WebSocket sender that broadcasts rendered frames to every connected viewer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::sink::SinkExt;
use futures::stream::StreamExt;
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::sender::{Sender, TransportError};

/// Frames buffered per client before a slow client starts skipping.
const CLIENT_BACKLOG: usize = 16;

pub struct WebSocketSender {
    addr: SocketAddr,
    text: bool,
    tx: broadcast::Sender<Message>,
    clients: Arc<AtomicUsize>,
    runtime: Option<Runtime>,
}

impl WebSocketSender {
    /// Binds `host:port` and starts accepting viewers on a background runtime.
    /// `text` selects text frames (JSON) or binary frames (bincode).
    pub fn start(host: &str, port: u16, text: bool) -> Result<Self, TransportError> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| TransportError::Configuration(format!("Invalid address: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ws-transport")
            .enable_all()
            .build()?;

        let listener = runtime
            .block_on(TcpListener::bind(addr))
            .map_err(|e| TransportError::WebSocket(format!("Failed to bind {}: {}", addr, e)))?;
        let addr = listener.local_addr()?;
        info!("WebSocket server listening on ws://{}", addr);

        let (tx, _) = broadcast::channel::<Message>(CLIENT_BACKLOG);
        let clients = Arc::new(AtomicUsize::new(0));

        let accept_tx = tx.clone();
        let accept_clients = Arc::clone(&clients);
        runtime.spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let rx = accept_tx.subscribe();
                tokio::spawn(handle_connection(stream, rx, peer, Arc::clone(&accept_clients)));
            }
        });

        Ok(Self {
            addr,
            text,
            tx,
            clients,
            runtime: Some(runtime),
        })
    }

    /// Address actually bound (useful when port 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Sender for WebSocketSender {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.clients.load(Ordering::Relaxed) == 0 {
            return Ok(());
        }
        let message = if self.text {
            let text = String::from_utf8(data.to_vec())
                .map_err(|e| TransportError::WebSocket(format!("Invalid UTF-8: {}", e)))?;
            Message::Text(text)
        } else {
            Message::Binary(data.to_vec())
        };
        // Fails only when every viewer disconnected in the meantime.
        let _ = self.tx.send(message);
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn client_count(&self) -> Option<usize> {
        Some(self.clients.load(Ordering::Relaxed))
    }
}

impl Drop for WebSocketSender {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn handle_connection(
    raw_stream: TcpStream,
    mut rx: broadcast::Receiver<Message>,
    peer: SocketAddr,
    clients: Arc<AtomicUsize>,
) {
    let ws_stream = match accept_async(raw_stream).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Error during WebSocket handshake with {}: {}", peer, e);
            return;
        }
    };
    let total = clients.fetch_add(1, Ordering::Relaxed) + 1;
    info!("Client connected: {}. Total clients: {}", peer, total);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(message) => {
                    if let Err(e) = ws_sender.send(message).await {
                        if !is_disconnect_error(&e) {
                            warn!("WebSocket send error: {} - {}", peer, e);
                        }
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Client {} lagged, skipped {} frames", peer, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = ws_receiver.next() => match incoming {
                // Viewers have nothing to say; ignore their messages.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    if !is_disconnect_error(&e) {
                        warn!("WebSocket receive error: {} - {}", peer, e);
                    }
                    break;
                }
                None => break,
            },
        }
    }

    let total = clients.fetch_sub(1, Ordering::Relaxed) - 1;
    info!("Client disconnected: {}. Total clients: {}", peer, total);
}

fn is_disconnect_error(e: &WsError) -> bool {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Io(io_err) => matches!(
            io_err.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_without_clients_is_a_no_op() {
        let sender = WebSocketSender::start("127.0.0.1", 0, true).expect("bind on ephemeral port");
        assert_ne!(sender.local_addr().port(), 0);
        assert_eq!(sender.client_count(), Some(0));
        assert!(sender.send(br#"{"tick":1}"#).is_ok());
    }

    #[test]
    fn invalid_host_is_configuration_error() {
        let result = WebSocketSender::start("not an address", 8080, true);
        assert!(matches!(result, Err(TransportError::Configuration(_))));
    }
}
