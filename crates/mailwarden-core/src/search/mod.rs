//! Mailbox searching.
//!
//! One connection at a time, per-profile batch searches, and the seams that
//! let the whole pipeline run against an in-memory mailbox in tests.

mod client;
mod decode;
mod resolve;
mod session;

pub use client::{
    MailSearchClient, MessageSummary, ProfileSearchResult, MSG_PROFILE_INACTIVE,
    MSG_PROFILE_NO_CRITERIA,
};
pub use decode::decode_header;
pub use resolve::{resolve_mailbox_host, IMAP_TLS_PORT};
pub use session::{ConnectError, MailConnector, MailSession, RawMessage, SessionError};
