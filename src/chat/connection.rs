// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! WebSocket connection lifecycle
//!
//! [`ChatSender`] is the send primitive used by the dispatcher and streaming
//! tasks. [`Supervisor`] owns the authenticate-connect-read cycle and
//! reconnects after a fixed backoff whenever the socket goes away.
//!
//! Inbound text frames are pushed, in arrival order, into a bounded channel
//! read by the dispatcher. The channel outlives individual connections.

use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::chat::auth::{identity_headers, Authenticator, Credentials};
use crate::chat::protocol::OutboundEvent;
use crate::config::ChatConfig;
use crate::error::{Result, WoodyError};

/// How long a closing connection waits for its writer
const WRITER_GRACE: Duration = Duration::from_secs(2);

pub type ChatSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cloneable handle for sending events to whichever socket is currently open
#[derive(Clone, Default)]
pub struct ChatSender {
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<OutboundEvent>>>>,
}

impl ChatSender {
    /// A sender with no socket attached; every send is dropped until `attach`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender attached to a fresh channel, for driving the bot without a socket.
    pub fn connected() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let sender = Self::new();
        let (tx, rx) = mpsc::unbounded_channel();
        sender.attach(tx);
        (sender, rx)
    }

    /// Route events to a new connection's writer.
    pub fn attach(&self, tx: mpsc::UnboundedSender<OutboundEvent>) {
        *self.slot() = Some(tx);
    }

    /// Stop routing events; the writer sees the channel close.
    pub fn detach(&self) {
        *self.slot() = None;
    }

    pub fn is_connected(&self) -> bool {
        self.slot().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue an event for the open socket. Without one the event is logged and dropped.
    pub fn send(&self, event: OutboundEvent) -> bool {
        let slot = self.slot();
        let Some(tx) = slot.as_ref() else {
            tracing::warn!(kind = ?event.kind, room = %event.room_id, "Not connected, dropping event");
            return false;
        };

        match tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                tracing::warn!(kind = ?event.kind, room = %event.room_id, "Connection writer gone, dropping event");
                false
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<OutboundEvent>>> {
        match self.outbound.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Why a connection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The server closed the socket or the stream ended
    Closed,
    /// Shutdown was requested
    Shutdown,
    /// The dispatcher stopped reading inbound frames
    DispatcherGone,
}

/// Open the websocket with the session cookie and identity headers attached.
pub async fn connect(chat: &ChatConfig, credentials: &Credentials) -> Result<ChatSocket> {
    let mut request = chat.ws_url.as_str().into_client_request()?;
    let headers = request.headers_mut();

    headers.insert(
        "Cookie",
        HeaderValue::from_str(&credentials.cookie_header())
            .map_err(|e| WoodyError::Transport(format!("invalid cookie header: {}", e)))?,
    );
    for (name, value) in identity_headers(chat) {
        headers.insert(
            name,
            HeaderValue::from_str(&value)
                .map_err(|e| WoodyError::Transport(format!("invalid {} header: {}", name, e)))?,
        );
    }

    let (socket, response) = tokio_tungstenite::connect_async(request).await?;
    tracing::debug!(status = response.status().as_u16(), url = %chat.ws_url, "WebSocket upgraded");
    Ok(socket)
}

/// Pump one connection until it closes or shutdown is requested.
///
/// Outbound events go through a writer task fed by `sender`; inbound text
/// frames go to `inbound` in arrival order.
pub async fn run_connection<S>(
    socket: WebSocketStream<S>,
    sender: &ChatSender,
    inbound: &mpsc::Sender<String>,
    shutdown: &CancellationToken,
) -> Result<ConnectionEnd>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (mut write, mut read) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();
    sender.attach(tx);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!(error = %e, "Failed to write to socket");
                break;
            }
        }
        // closes with a Close frame when the socket is still healthy
        let _ = write.close().await;
    });

    let outcome = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(ConnectionEnd::Shutdown),
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(text.as_str().to_owned()).await.is_err() {
                        break Ok(ConnectionEnd::DispatcherGone);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Server closed the connection");
                    break Ok(ConnectionEnd::Closed);
                }
                // pings are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(WoodyError::from(e)),
                None => break Ok(ConnectionEnd::Closed),
            }
        }
    };

    sender.detach();
    join_writer(writer, WRITER_GRACE).await;

    outcome
}

/// Wait for the writer to flush and close; abort it if it is stuck.
/// Returns whether it finished on its own.
async fn join_writer(writer: JoinHandle<()>, grace: Duration) -> bool {
    let abort = writer.abort_handle();
    match tokio::time::timeout(grace, writer).await {
        Ok(_) => true,
        Err(_) => {
            tracing::warn!("Socket writer did not finish in time, aborting it");
            abort.abort();
            false
        }
    }
}

/// Keeps the bot connected: authenticate, connect, read, back off, repeat
pub struct Supervisor {
    chat: ChatConfig,
    authenticator: Authenticator,
    sender: ChatSender,
    inbound: mpsc::Sender<String>,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(
        chat: ChatConfig,
        authenticator: Authenticator,
        sender: ChatSender,
        inbound: mpsc::Sender<String>,
        reconnect_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            chat,
            authenticator,
            sender,
            inbound,
            reconnect_delay,
            shutdown,
        }
    }

    /// Reconnect loop. Returns `Ok` on shutdown; `Err` only for fatal errors
    /// or when the dispatcher has stopped.
    pub async fn run(&self) -> Result<()> {
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            match self.connect_once().await {
                Ok(ConnectionEnd::Shutdown) => return Ok(()),
                Ok(ConnectionEnd::DispatcherGone) => {
                    return Err(WoodyError::Transport(
                        "dispatcher stopped reading frames".to_string(),
                    ));
                }
                Ok(ConnectionEnd::Closed) => {
                    tracing::warn!(
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Connection closed, reconnecting"
                    );
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Connection failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// One full authenticate-then-connect cycle with fresh credentials.
    async fn connect_once(&self) -> Result<ConnectionEnd> {
        let credentials = self.authenticator.authenticate().await?;
        tracing::info!(account = self.authenticator.account_name(), "Authenticated");

        let socket = connect(&self.chat, &credentials).await?;
        tracing::info!(url = %self.chat.ws_url, "Connected");

        run_connection(socket, &self.sender, &self.inbound, &self.shutdown).await
    }
}
