//! Live-update channel.
//!
//! One background tokio task per session keeps a TCP connection to the
//! live-update server open and answers the server's commands (see
//! [`chatservice_shared::protocol`]). The task loops until cancelled:
//!
//! ```text
//! Connecting -> Connected -> read line -> dispatch -> reply -> read line ...
//!      ^                         |
//!      +---- Reconnecting <------+  (end of stream, DISCONNECT, empty line,
//!                                    protocol fault, read/write error)
//! ```
//!
//! Cancellation is a per-session `watch` channel. Every await in the loop is
//! raced against it, so a blocked read is abandoned and the socket dropped as
//! soon as shutdown is signalled.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use chatservice_shared::constants::{CMD_ACK, MAX_LINE_LEN};
use chatservice_shared::protocol::{decode_line, encode_line, ServerCommand};
use chatservice_shared::{Identity, ProtocolError};

use crate::config::{ReconnectPolicy, SessionConfig};
use crate::events::{ConnectionState, EventHub};

/// What to do after a server line has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this line back.
    Line(String),
    /// Close the connection without answering, then reconnect.
    Close,
}

/// Why a single connection ended.
#[derive(Debug)]
enum ConnectionEnd {
    Cancelled,
    Dropped(String),
}

/// Client side of the live-update protocol for one session.
pub struct LiveUpdateClient {
    address: String,
    username: String,
    identity: Identity,
    channel: String,
    reconnect: ReconnectPolicy,
    events: EventHub,
    state_tx: watch::Sender<ConnectionState>,
}

impl LiveUpdateClient {
    pub fn new(config: &SessionConfig, identity: Identity, channel: &str, events: EventHub) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            address: config.live_update_address.clone(),
            username: config.username.clone(),
            identity,
            channel: channel.to_string(),
            reconnect: config.reconnect,
            events,
            state_tx,
        }
    }

    /// Observe connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Run the connect/read loop on a new tokio task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Connect/read loop. Returns only once `shutdown` turns `true` or its
    /// sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.events.log("[Live Update Service] Starting...");
        let mut delay = self.reconnect.initial_delay;

        loop {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                result = TcpStream::connect(self.address.as_str()) => result,
            };

            match connected {
                Ok(stream) => {
                    delay = self.reconnect.initial_delay;
                    self.set_state(ConnectionState::Connected);
                    info!(addr = %self.address, "Connected to live update server");
                    self.events.log("[Live Update Service] Connected to server");

                    match self.serve_connection(stream, &mut shutdown).await {
                        ConnectionEnd::Cancelled => break,
                        ConnectionEnd::Dropped(reason) => {
                            warn!(addr = %self.address, reason = %reason, "Live update connection dropped");
                            self.events
                                .log(&format!("[Live Update Service] Connection dropped: {reason}"));
                        }
                    }
                }
                Err(e) => {
                    warn!(addr = %self.address, error = %e, "Live update connect failed");
                    self.events
                        .log(&format!("[Live Update Service] Failed to connect: {e}"));
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
                tokio::select! {
                    _ = wait_for_shutdown(&mut shutdown) => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            delay = self.reconnect.next_delay(delay);
        }

        self.set_state(ConnectionState::Stopped);
        info!("Live update service stopped");
        self.events.log("[Live Update Service] Exiting...");
    }

    /// Answer server commands on one established connection until it ends.
    async fn serve_connection(
        &self,
        stream: TcpStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ConnectionEnd {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        loop {
            let frame = tokio::select! {
                _ = wait_for_shutdown(shutdown) => return ConnectionEnd::Cancelled,
                frame = read_frame(&mut reader) => frame,
            };

            let line = match frame.and_then(|f| f.map(decode_line).transpose()) {
                Ok(Some(line)) => line,
                Ok(None) => return ConnectionEnd::Dropped("server closed the connection".into()),
                Err(e) => return ConnectionEnd::Dropped(format!("read failed: {e}")),
            };
            debug!(line = %line, "Live update server line");

            let reply = match self.respond(&line) {
                Ok(Reply::Line(reply)) => reply,
                Ok(Reply::Close) => {
                    self.events.log(
                        "[Live Update Service] Disconnect requested by server, reconnecting",
                    );
                    return ConnectionEnd::Dropped("disconnect requested".into());
                }
                Err(ProtocolError::EmptyLine) => {
                    self.events.log(
                        "[Live Update Service] Server sent empty message, abandoning connection",
                    );
                    return ConnectionEnd::Dropped("empty line".into());
                }
                Err(e) => return ConnectionEnd::Dropped(format!("protocol error: {e}")),
            };
            debug!(reply = %reply, "Live update reply");

            let encoded = encode_line(&reply);
            let written = tokio::select! {
                _ = wait_for_shutdown(shutdown) => return ConnectionEnd::Cancelled,
                result = write_half.write_all(&encoded) => result,
            };
            if let Err(e) = written {
                self.events
                    .log(&format!("[Live Update Service] Failed to respond to server: {e}"));
                return ConnectionEnd::Dropped(format!("write failed: {e}"));
            }
        }
    }

    /// Handle one unescaped server line and decide the reply.
    ///
    /// Event commands fire their listeners before this returns. Any error
    /// means the connection must be dropped.
    pub fn respond(&self, line: &str) -> Result<Reply, ProtocolError> {
        let reply = match ServerCommand::parse(line)? {
            ServerCommand::Username => self.username.clone(),
            ServerCommand::PubKey => self.identity.public_key(),
            ServerCommand::Sign(text) => self.identity.sign(&text),
            ServerCommand::Channel => self.channel.clone(),
            ServerCommand::Ack => CMD_ACK.to_string(),
            ServerCommand::Disconnect => return Ok(Reply::Close),
            ServerCommand::Msg(message) => {
                self.events.emit_message(&message);
                CMD_ACK.to_string()
            }
            ServerCommand::Online(user) => {
                self.events.emit_user_online(&user);
                CMD_ACK.to_string()
            }
            ServerCommand::Offline(user) => {
                self.events.emit_user_offline(&user);
                CMD_ACK.to_string()
            }
            ServerCommand::Unknown(command) => {
                warn!(command = %command, "Unknown live update command, answering ACK");
                self.events.log(
                    "[Live Update Service] Unknown server message, responding with ACK. You should update your client.",
                );
                CMD_ACK.to_string()
            }
        };
        Ok(Reply::Line(reply))
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            self.events.emit_state(state);
        }
    }
}

/// Read one raw frame including its `\n`.
///
/// `Ok(None)` means end of stream, including a stream that ends mid-line.
async fn read_frame(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut buf = Vec::new();
    let limit = (MAX_LINE_LEN + 1) as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        if buf.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong { max: MAX_LINE_LEN });
        }
        return Ok(None);
    }
    Ok(Some(buf))
}

/// Resolves once shutdown is requested or the session is gone.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
