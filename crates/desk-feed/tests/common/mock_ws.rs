//! Mock WebSocket server for feed tests.
//!
//! Accepts connections, records inbound text frames (subscribe requests),
//! and can push frames to (or drop) every connected client.

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum ServerCommand {
    Text(String),
    Close,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    clients: Arc<Mutex<Vec<mpsc::Sender<ServerCommand>>>>,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let clients: Arc<Mutex<Vec<mpsc::Sender<ServerCommand>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let clients_clone = clients.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let (cmd_tx, cmd_rx) = mpsc::channel(16);
                        clients_clone.lock().await.push(cmd_tx);
                        *connections_clone.lock().await += 1;
                        tokio::spawn(handle_connection(stream, messages_clone.clone(), cmd_rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            clients,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of connections accepted so far (including dropped ones).
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// All text frames received from clients.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Push a text frame to every connected client.
    pub async fn send_text(&self, text: impl Into<String>) {
        let text = text.into();
        for client in self.clients.lock().await.iter() {
            let _ = client.send(ServerCommand::Text(text.clone())).await;
        }
    }

    /// Close every connected client (server-side disconnect).
    pub async fn close_clients(&self) {
        let clients: Vec<_> = self.clients.lock().await.drain(..).collect();
        for client in clients {
            let _ = client.send(ServerCommand::Close).await;
        }
    }

    /// Shut the server down.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<VecDeque<String>>>,
    mut commands: mpsc::Receiver<ServerCommand>,
) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        messages.lock().await.push_back(text.to_string());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return;
                    }
                    _ => {}
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(ServerCommand::Text(text)) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            return;
                        }
                    }
                    Some(ServerCommand::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                }
            }
        }
    }
}
