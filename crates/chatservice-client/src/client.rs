//! Session facade.
//!
//! [`ChatClient`] ties the request transport, the live-update task and the
//! trusted-user list into one session scoped to a single channel.
//!
//! A session is owned by one caller. Its [`TrustStore`] is mutated through
//! `&mut ChatClient` and is never touched by the live-update task, so it needs
//! no locking; presentation layers that share the session across threads must
//! wrap it themselves. Event listeners run on the live-update task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use chatservice_shared::constants::DEFAULT_MESSAGE_LIMIT;
use chatservice_shared::{Identity, Message, OutgoingMessage, User};

use crate::config::SessionConfig;
use crate::error::{ClientError, Result};
use crate::events::{ConnectionState, EventHub};
use crate::http::{HttpTransport, RequestTransport};
use crate::live_update::LiveUpdateClient;
use crate::trust::{JsonFileTrustPersistence, TrustPersistence, TrustStore};

/// One chat session against one channel.
pub struct ChatClient {
    config: SessionConfig,
    channel: String,
    identity: Identity,
    transport: Arc<dyn RequestTransport>,
    persistence: Arc<dyn TrustPersistence>,
    trusted_users: TrustStore,
    events: EventHub,
    connected: bool,
    shut_down: bool,
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<ConnectionState>,
    live_task: Option<JoinHandle<()>>,
}

impl ChatClient {
    /// Create a session using the HTTP transport and the default
    /// `trustedusers.json` file.
    pub fn new(config: SessionConfig, channel: impl Into<String>) -> Result<Self> {
        Self::with_persistence(
            config,
            channel,
            Arc::new(JsonFileTrustPersistence::default()),
        )
    }

    /// Create a session using the HTTP transport and the given trust storage.
    pub fn with_persistence(
        mut config: SessionConfig,
        channel: impl Into<String>,
        persistence: Arc<dyn TrustPersistence>,
    ) -> Result<Self> {
        config.normalize_addresses();
        let transport = Arc::new(HttpTransport::new(&config.server_address));
        Self::with_collaborators(config, channel, transport, persistence)
    }

    /// Create a session with explicit collaborators. The trust list is loaded
    /// from `persistence` before this returns.
    pub fn with_collaborators(
        mut config: SessionConfig,
        channel: impl Into<String>,
        transport: Arc<dyn RequestTransport>,
        persistence: Arc<dyn TrustPersistence>,
    ) -> Result<Self> {
        config.normalize_addresses();
        let identity = Identity::from_private_key(&config.private_key)?;

        let mut trusted_users = TrustStore::new();
        trusted_users.load(persistence.as_ref())?;

        let events = EventHub::new(config.log_sink.clone());
        let (shutdown_tx, _) = watch::channel(false);
        let (_, state_rx) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            config,
            channel: channel.into(),
            identity,
            transport,
            persistence,
            trusted_users,
            events,
            connected: false,
            shut_down: false,
            shutdown_tx,
            state_rx,
            live_task: None,
        })
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn public_key(&self) -> String {
        self.identity.public_key()
    }

    pub fn private_key(&self) -> &str {
        &self.config.private_key
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn trusted_users(&self) -> &TrustStore {
        &self.trusted_users
    }

    pub fn trusted_users_mut(&mut self) -> &mut TrustStore {
        &mut self.trusted_users
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Current live-update connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Probe the server, then start live updates (unless disabled).
    ///
    /// # Errors
    ///
    /// - [`ClientError::AlreadyConnected`] on a second call
    /// - [`ClientError::ShutDown`] after [`ChatClient::shutdown`]
    /// - [`ClientError::ConnectionFailed`] if the server cannot be reached
    pub async fn connect(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(ClientError::ShutDown);
        }
        if self.connected {
            return Err(ClientError::AlreadyConnected);
        }

        self.transport
            .get_online_users()
            .await
            .map_err(ClientError::ConnectionFailed)?;

        if self.config.enable_live_updates {
            self.events.log("[Chat Client] Starting live update task");
            let live = LiveUpdateClient::new(
                &self.config,
                self.identity.clone(),
                &self.channel,
                self.events.clone(),
            );
            self.state_rx = live.state_receiver();
            self.live_task = Some(live.spawn(self.shutdown_tx.subscribe()));
        } else {
            self.events.log("[Chat Client] Live update task has been disabled");
        }

        self.connected = true;
        info!(
            user = %self.config.username,
            channel = %self.channel,
            live_updates = self.config.enable_live_updates,
            "Chat session connected"
        );
        Ok(())
    }

    /// Sign `text` as the local user and post it to the channel.
    ///
    /// Returns the server's copy, carrying its id and timestamp.
    pub async fn send_message(&self, text: &str) -> Result<Message> {
        let outgoing = OutgoingMessage::signed(&self.identity, &self.config.username, text);
        Ok(self.transport.send_message(&self.channel, &outgoing).await?)
    }

    /// Fetch a page of channel history. Paging is entirely server-defined.
    pub async fn get_messages(&self, limit: u32, offset: u32) -> Result<Vec<Message>> {
        Ok(self
            .transport
            .get_messages(&self.channel, limit, offset)
            .await?)
    }

    /// The latest page of history with the default page size.
    pub async fn get_recent_messages(&self) -> Result<Vec<Message>> {
        self.get_messages(DEFAULT_MESSAGE_LIMIT, 0).await
    }

    pub async fn get_online_users(&self) -> Result<Vec<User>> {
        Ok(self.transport.get_online_users().await?)
    }

    pub fn on_message(&self, listener: impl Fn(&Message) + Send + Sync + 'static) {
        self.events.on_message(listener);
    }

    pub fn on_user_online(&self, listener: impl Fn(&User) + Send + Sync + 'static) {
        self.events.on_user_online(listener);
    }

    pub fn on_user_offline(&self, listener: impl Fn(&User) + Send + Sync + 'static) {
        self.events.on_user_offline(listener);
    }

    pub fn on_connection_state(&self, listener: impl Fn(ConnectionState) + Send + Sync + 'static) {
        self.events.on_connection_state(listener);
    }

    /// Whether the message was signed by this session's own key.
    pub fn is_own_message(&self, message: &Message) -> bool {
        message.was_sent_by(&self.identity)
    }

    /// Whether the message comes from a trusted user.
    pub fn is_message_trusted(&self, message: &Message) -> bool {
        self.trusted_users.is_message_from_trusted_user(message)
    }

    /// Whether `user` is this session's own identity.
    pub fn is_self(&self, user: &User) -> bool {
        user.is_identity(&self.config.username, &self.identity.public_key())
    }

    /// Persist the trust list now.
    pub fn save_trusted_users(&self) -> Result<()> {
        self.trusted_users.save(self.persistence.as_ref())?;
        Ok(())
    }

    /// Stop live updates, wait for the task to exit, then save the trust list.
    ///
    /// Calling this more than once is a no-op. The session cannot reconnect
    /// afterwards.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.live_task.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Live update task ended abnormally");
            }
        }
        self.connected = false;
        info!(channel = %self.channel, "Chat session shut down");

        self.save_trusted_users()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        // Without an async context the task cannot be awaited here; it exits
        // on its own once it sees the signal.
        self.shutdown_tx.send_replace(true);
    }
}
