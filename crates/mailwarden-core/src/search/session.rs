//! Connection and session seams for the mailbox search client.
//!
//! The client is generic over a [`MailConnector`] so the orchestration and
//! batch logic can be exercised against an in-memory mailbox in tests while
//! production wires in a real protocol implementation.

use async_trait::async_trait;

use crate::criteria::FilterExpr;

/// Error establishing a mailbox connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// Address or secret is blank.
    #[error("Incomplete credentials")]
    IncompleteCredentials,
    /// No mailbox server could be derived from the configured host.
    #[error("Cannot derive a mailbox server from {0}")]
    UnresolvableServer(String),
    /// The server did not accept a connection.
    #[error("Mailbox server unreachable: {0}")]
    ServerUnreachable(String),
    /// The server rejected the credentials.
    #[error("Authentication failed")]
    AuthenticationFailed,
    /// The connection attempt timed out.
    #[error("Connection timed out")]
    Timeout,
    /// Any other failure.
    #[error("Connection failed: {0}")]
    Unknown(String),
}

/// Error from an operation on an established session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server rejected or failed the search.
    #[error("Search failed: {0}")]
    SearchFailed(String),
    /// A message could not be fetched.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// The session is no longer usable.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Raw headers of one fetched message, before any header decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Message sequence number within the mailbox.
    pub sequence: u32,
    /// Raw `Subject` header value.
    pub subject: String,
    /// Raw `From` header value.
    pub from: String,
    /// Raw `Date` header value.
    pub date: String,
}

/// An authenticated mailbox session over the inbox.
#[async_trait]
pub trait MailSession: Send {
    /// Run a search over the inbox, returning matching sequence numbers.
    async fn search(&mut self, filter: &FilterExpr) -> Result<Vec<u32>, SessionError>;

    /// Fetch the headers of one message by sequence number.
    async fn fetch_headers(&mut self, sequence: u32) -> Result<RawMessage, SessionError>;

    /// Log out and release the connection.
    async fn close(&mut self);
}

/// Factory for mailbox sessions.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// The session type this connector produces.
    type Session: MailSession;

    /// Connect and authenticate against the given server.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        address: &str,
        secret: &str,
    ) -> Result<Self::Session, ConnectError>;
}
