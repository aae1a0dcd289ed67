//! Request/response channel.
//!
//! [`RequestTransport`] is the seam the session talks through; [`HttpTransport`]
//! implements it against the chat server's HTTP API:
//!
//! - `POST /channel/{channel}` with an [`OutgoingMessage`] body
//! - `GET /channel/{channel}?limit=&offset=`
//! - `GET /online`

use async_trait::async_trait;
use tracing::debug;

use chatservice_shared::{Message, OutgoingMessage, User};

use crate::error::TransportError;

/// The three request/response operations a session needs.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Post a message and return the server's canonical copy.
    async fn send_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<Message, TransportError>;

    async fn get_messages(
        &self,
        channel: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, TransportError>;

    async fn get_online_users(&self) -> Result<Vec<User>, TransportError>;
}

/// [`RequestTransport`] over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `server_address` is `host:port` without a scheme.
    pub fn new(server_address: &str) -> Self {
        Self::with_client(reqwest::Client::new(), server_address)
    }

    pub fn with_client(client: reqwest::Client, server_address: &str) -> Self {
        Self {
            client,
            base_url: format!("http://{}", server_address.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn channel_url(&self, channel: &str) -> String {
        format!("{}/channel/{}", self.base_url, channel)
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn send_message(
        &self,
        channel: &str,
        message: &OutgoingMessage,
    ) -> Result<Message, TransportError> {
        let url = self.channel_url(channel);
        debug!(url = %url, "Posting message");

        let resp = self.client.post(&url).json(message).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // The server may put {"Error": ...} in either a failing or a
        // successful response.
        let value: serde_json::Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(TransportError::Decode(e)),
        };
        if let Some(error) = value.get("Error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(TransportError::Server(message));
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_value(value)?)
    }

    async fn get_messages(
        &self,
        channel: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, TransportError> {
        let url = self.channel_url(channel);
        debug!(url = %url, limit, offset, "Fetching messages");

        let resp = self
            .client
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        decode_json(resp).await
    }

    async fn get_online_users(&self) -> Result<Vec<User>, TransportError> {
        let url = format!("{}/online", self.base_url);
        debug!(url = %url, "Fetching online users");

        let resp = self.client.get(&url).send().await?;
        decode_json(resp).await
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
        });
    }
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}
