//! Listener registry for live-update events.
//!
//! Each event kind keeps its own ordered list of callbacks. Dispatch takes a
//! snapshot of the list first, so a listener may register further listeners
//! without deadlocking; those only see later events. Listeners run
//! synchronously, in registration order, on the live-update task. Events that
//! arrive while no listener is registered are logged and dropped, never
//! queued.

use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use chatservice_shared::{Message, User};

use crate::config::LogSink;

pub type MessageListener = Arc<dyn Fn(&Message) + Send + Sync>;
pub type UserListener = Arc<dyn Fn(&User) + Send + Sync>;
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Live-update connection state as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started, or live updates disabled.
    Disconnected,
    /// Opening the TCP connection.
    Connecting,
    /// Connected and answering server commands.
    Connected,
    /// The last connection failed or dropped; waiting to retry.
    Reconnecting,
    /// Cancelled; the live-update task has exited or is exiting.
    Stopped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Listeners {
    message: Vec<MessageListener>,
    user_online: Vec<UserListener>,
    user_offline: Vec<UserListener>,
    state: Vec<StateListener>,
}

/// Shared between the session (registration) and the live-update task
/// (dispatch).
#[derive(Clone, Default)]
pub struct EventHub {
    listeners: Arc<Mutex<Listeners>>,
    log_sink: Option<LogSink>,
}

impl EventHub {
    pub fn new(log_sink: Option<LogSink>) -> Self {
        Self {
            listeners: Arc::default(),
            log_sink,
        }
    }

    pub fn on_message(&self, listener: impl Fn(&Message) + Send + Sync + 'static) {
        self.with_listeners(|l| l.message.push(Arc::new(listener)));
    }

    pub fn on_user_online(&self, listener: impl Fn(&User) + Send + Sync + 'static) {
        self.with_listeners(|l| l.user_online.push(Arc::new(listener)));
    }

    pub fn on_user_offline(&self, listener: impl Fn(&User) + Send + Sync + 'static) {
        self.with_listeners(|l| l.user_offline.push(Arc::new(listener)));
    }

    pub fn on_connection_state(&self, listener: impl Fn(ConnectionState) + Send + Sync + 'static) {
        self.with_listeners(|l| l.state.push(Arc::new(listener)));
    }

    pub(crate) fn emit_message(&self, message: &Message) {
        let listeners = self.snapshot(|l| l.message.clone());
        if listeners.is_empty() {
            self.log("[Chat Client] No message listener registered, dropping message");
            return;
        }
        debug!(id = %message.id, count = listeners.len(), "Dispatching message event");
        for listener in listeners {
            listener(message);
        }
    }

    pub(crate) fn emit_user_online(&self, user: &User) {
        let listeners = self.snapshot(|l| l.user_online.clone());
        if listeners.is_empty() {
            self.log("[Chat Client] No user-online listener registered, dropping event");
            return;
        }
        debug!(user = %user.username, "Dispatching user-online event");
        for listener in listeners {
            listener(user);
        }
    }

    pub(crate) fn emit_user_offline(&self, user: &User) {
        let listeners = self.snapshot(|l| l.user_offline.clone());
        if listeners.is_empty() {
            self.log("[Chat Client] No user-offline listener registered, dropping event");
            return;
        }
        debug!(user = %user.username, "Dispatching user-offline event");
        for listener in listeners {
            listener(user);
        }
    }

    pub(crate) fn emit_state(&self, state: ConnectionState) {
        for listener in self.snapshot(|l| l.state.clone()) {
            listener(state);
        }
    }

    /// Log a lifecycle line to `tracing` and mirror it to the sink.
    pub(crate) fn log(&self, line: &str) {
        debug!("{line}");
        if let Some(sink) = &self.log_sink {
            sink(line);
        }
    }

    fn with_listeners(&self, f: impl FnOnce(&mut Listeners)) {
        match self.listeners.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(e) => error!(error = %e, "Listener registry lock poisoned"),
        }
    }

    fn snapshot<T>(&self, f: impl FnOnce(&Listeners) -> Vec<T>) -> Vec<T> {
        match self.listeners.lock() {
            Ok(guard) => f(&guard),
            Err(e) => {
                error!(error = %e, "Listener registry lock poisoned");
                Vec::new()
            }
        }
    }
}
