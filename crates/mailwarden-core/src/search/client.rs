//! Mailbox search client.
//!
//! Holds at most one live session and runs searches over it, including the
//! per-profile batch used by scheduled runs. Search failures degrade to
//! empty results so one bad profile or a flaky fetch never aborts a batch.

use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MailCredentials;
use crate::criteria::{self, FilterExpr};
use crate::profile::{ProfileId, SearchProfile};

use super::decode::decode_header;
use super::resolve::{resolve_mailbox_host, IMAP_TLS_PORT};
use super::session::{ConnectError, MailConnector, MailSession, SessionError};

/// Bound on how long a connection attempt may take.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Skip message for a profile that is switched off.
pub const MSG_PROFILE_INACTIVE: &str = "Perfil inactivo";
/// Skip message for a profile with no usable criteria.
pub const MSG_PROFILE_NO_CRITERIA: &str = "Perfil sin criterio de busqueda";

/// Decoded headers of one matched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Message sequence number within the mailbox.
    pub sequence: u32,
    /// Decoded subject.
    pub subject: String,
    /// Decoded sender.
    pub from: String,
    /// Raw date header.
    pub date: String,
}

/// Outcome of one profile within a batch search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSearchResult {
    /// Profile display name, carried for reporting.
    pub profile_name: String,
    /// Whether the profile's search ran to completion.
    pub success: bool,
    /// Number of matching messages.
    pub emails_found: u64,
    /// Human-readable outcome, in the application's reporting language.
    pub message: String,
}

impl ProfileSearchResult {
    fn skipped(name: &str, message: &str) -> Self {
        Self {
            profile_name: name.to_string(),
            success: false,
            emails_found: 0,
            message: message.to_string(),
        }
    }
}

/// Search client over a single mailbox connection.
pub struct MailSearchClient<C: MailConnector> {
    connector: C,
    session: Option<C::Session>,
}

impl<C: MailConnector> MailSearchClient<C> {
    /// Create a disconnected client.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
        }
    }

    /// Whether a session is currently held.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connect and authenticate, replacing any existing session.
    ///
    /// The mailbox host is derived from the credentials' outgoing server.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectError`] describing why no session could be
    /// established; blank credentials fail before any network activity.
    pub async fn connect(
        &mut self,
        credentials: &MailCredentials,
    ) -> Result<(), ConnectError> {
        if credentials.address.trim().is_empty() || credentials.secret.is_empty() {
            return Err(ConnectError::IncompleteCredentials);
        }
        let host = resolve_mailbox_host(&credentials.server_host)?;

        self.disconnect().await;

        let attempt = self.connector.connect(
            &host,
            IMAP_TLS_PORT,
            &credentials.address,
            &credentials.secret,
        );
        let session = tokio::time::timeout(CONNECT_TIMEOUT, attempt)
            .await
            .map_err(|_| ConnectError::Timeout)??;

        info!(host = %host, "mailbox connection established");
        self.session = Some(session);
        Ok(())
    }

    /// Close the session if one is held. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            debug!("mailbox connection closed");
        }
    }

    /// Count messages matching a filter. Any failure, including not being
    /// connected, degrades to zero.
    pub async fn search_count(&mut self, filter: &FilterExpr) -> u64 {
        match self.try_count(filter).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "search failed");
                0
            }
        }
    }

    async fn try_count(&mut self, filter: &FilterExpr) -> Result<u64, SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::ConnectionLost(
                "no mailbox connection".to_string(),
            ));
        };
        Ok(session.search(filter).await?.len() as u64)
    }

    /// Fetch decoded headers for up to `limit` matching messages.
    ///
    /// Messages whose fetch fails are skipped rather than failing the call.
    pub async fn search_details(
        &mut self,
        filter: &FilterExpr,
        limit: usize,
    ) -> Vec<MessageSummary> {
        let Some(session) = self.session.as_mut() else {
            warn!("search requested without a connection");
            return Vec::new();
        };
        let sequences = match session.search(filter).await {
            Ok(sequences) => sequences,
            Err(err) => {
                warn!(error = %err, "search failed");
                return Vec::new();
            }
        };

        // Highest sequence numbers are the most recent messages.
        let start = sequences.len().saturating_sub(limit);
        let mut summaries = Vec::new();
        for &sequence in sequences[start..].iter().rev() {
            match session.fetch_headers(sequence).await {
                Ok(raw) => summaries.push(MessageSummary {
                    sequence: raw.sequence,
                    subject: decode_header(&raw.subject),
                    from: decode_header(&raw.from),
                    date: raw.date,
                }),
                Err(err) => {
                    warn!(sequence, error = %err, "skipping unfetchable message");
                }
            }
        }
        summaries
    }

    /// Run every profile's search over one connection.
    ///
    /// Inactive profiles and profiles without criteria are reported as
    /// skipped, not searched. A connect failure fans out to every profile
    /// so callers see a uniform per-profile result map. The connection is
    /// closed before returning, whatever happened.
    pub async fn search_many_profiles(
        &mut self,
        credentials: &MailCredentials,
        profiles: &[SearchProfile],
        since: NaiveDate,
    ) -> HashMap<ProfileId, ProfileSearchResult> {
        let mut results = HashMap::with_capacity(profiles.len());

        if let Err(err) = self.connect(credentials).await {
            warn!(error = %err, "batch search could not connect");
            for profile in profiles {
                results.insert(
                    profile.id,
                    ProfileSearchResult::skipped(&profile.name, &err.to_string()),
                );
            }
            return results;
        }

        for profile in profiles {
            if !profile.is_active {
                results.insert(
                    profile.id,
                    ProfileSearchResult::skipped(&profile.name, MSG_PROFILE_INACTIVE),
                );
                continue;
            }
            if profile.criteria.trim().is_empty() {
                results.insert(
                    profile.id,
                    ProfileSearchResult::skipped(&profile.name, MSG_PROFILE_NO_CRITERIA),
                );
                continue;
            }

            let filter = criteria::compile(&profile.criteria, since);
            match self.try_count(&filter).await {
                Ok(found) => {
                    debug!(profile = %profile.name, found, "profile search done");
                    results.insert(
                        profile.id,
                        ProfileSearchResult {
                            profile_name: profile.name.clone(),
                            success: true,
                            emails_found: found,
                            message: format!("{found} correos encontrados"),
                        },
                    );
                }
                // One failing profile does not abort the rest of the batch.
                Err(err) => {
                    warn!(profile = %profile.name, error = %err, "profile search failed");
                    results.insert(
                        profile.id,
                        ProfileSearchResult::skipped(&profile.name, &err.to_string()),
                    );
                }
            }
        }

        self.disconnect().await;
        results
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::session::RawMessage;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockMail {
        subject: String,
        date: NaiveDate,
    }

    struct MockSession {
        mailbox: Vec<MockMail>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MailSession for MockSession {
        async fn search(&mut self, filter: &FilterExpr) -> Result<Vec<u32>, SessionError> {
            Ok(self
                .mailbox
                .iter()
                .enumerate()
                .filter(|(_, mail)| filter.matches(&mail.subject, mail.date))
                .map(|(i, _)| u32::try_from(i).unwrap() + 1)
                .collect())
        }

        async fn fetch_headers(&mut self, sequence: u32) -> Result<RawMessage, SessionError> {
            let mail = self
                .mailbox
                .get(sequence as usize - 1)
                .ok_or_else(|| SessionError::FetchFailed(format!("no message {sequence}")))?;
            Ok(RawMessage {
                sequence,
                subject: mail.subject.clone(),
                from: "billing@example.com".to_string(),
                date: mail.date.format("%d-%b-%Y").to_string(),
            })
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockConnector {
        mailbox: Vec<MockMail>,
        fail_with: Option<ConnectError>,
        connects: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl MockConnector {
        fn new(mailbox: Vec<MockMail>) -> Self {
            Self {
                mailbox,
                fail_with: None,
                connects: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl MailConnector for MockConnector {
        type Session = MockSession;

        async fn connect(
            &self,
            _host: &str,
            _port: u16,
            _address: &str,
            _secret: &str,
        ) -> Result<MockSession, ConnectError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(MockSession {
                mailbox: self.mailbox.clone(),
                closes: Arc::clone(&self.closes),
            })
        }
    }

    fn credentials() -> MailCredentials {
        MailCredentials {
            address: "user@example.com".to_string(),
            secret: "hunter2".to_string(),
            server_host: "smtp.gmail.com".to_string(),
            server_port: 587,
        }
    }

    fn mail(subject: &str, y: i32, m: u32, d: u32) -> MockMail {
        MockMail {
            subject: subject.to_string(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        }
    }

    fn profile(name: &str, criteria: &str, active: bool) -> SearchProfile {
        SearchProfile {
            id: ProfileId::generate(),
            name: name.to_string(),
            criteria: criteria.to_string(),
            is_active: active,
            created_at: Utc::now(),
            updated_at: None,
            last_executed_at: None,
        }
    }

    #[tokio::test]
    async fn blank_credentials_fail_before_connecting() {
        let connector = MockConnector::new(Vec::new());
        let connects = Arc::clone(&connector.connects);
        let mut client = MailSearchClient::new(connector);

        let mut creds = credentials();
        creds.secret = String::new();
        assert_eq!(
            client.connect(&creds).await,
            Err(ConnectError::IncompleteCredentials)
        );
        assert_eq!(connects.load(Ordering::SeqCst), 0);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn search_count_matches_filter() {
        let connector = MockConnector::new(vec![
            mail("Factura marzo", 2024, 3, 5),
            mail("Factura abril", 2024, 4, 2),
            mail("Newsletter", 2024, 4, 2),
        ]);
        let mut client = MailSearchClient::new(connector);
        client.connect(&credentials()).await.unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let filter = criteria::compile("Factura", since);
        assert_eq!(client.search_count(&filter).await, 1);
    }

    #[tokio::test]
    async fn search_without_connection_is_zero() {
        let mut client = MailSearchClient::new(MockConnector::new(Vec::new()));
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let filter = criteria::compile("Factura", since);
        assert_eq!(client.search_count(&filter).await, 0);
    }

    #[tokio::test]
    async fn search_details_decodes_and_keeps_most_recent() {
        let connector = MockConnector::new(vec![
            mail("Factura marzo", 2024, 3, 5),
            mail("=?utf-8?Q?Factura_abril?=", 2024, 4, 2),
        ]);
        let mut client = MailSearchClient::new(connector);
        client.connect(&credentials()).await.unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let filter = criteria::compile("Factura", since);

        let details = client.search_details(&filter, 1).await;
        assert_eq!(details.len(), 1);
        // Limit keeps the most recent match, headers decoded.
        assert_eq!(details[0].subject, "Factura abril");
        assert_eq!(details[0].sequence, 2);
    }

    #[tokio::test]
    async fn batch_uses_one_connection_and_skips_inactive() {
        let connector = MockConnector::new(vec![
            mail("Factura marzo", 2024, 3, 5),
            mail("Factura abril", 2024, 4, 2),
        ]);
        let connects = Arc::clone(&connector.connects);
        let closes = Arc::clone(&connector.closes);
        let mut client = MailSearchClient::new(connector);

        let profiles = vec![
            profile("Facturas", "Factura", true),
            profile("Dormido", "Factura", false),
            profile("Vacio", "   ", true),
        ];
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let results = client
            .search_many_profiles(&credentials(), &profiles, since)
            .await;

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!client.is_connected());

        let facturas = &results[&profiles[0].id];
        assert!(facturas.success);
        assert_eq!(facturas.emails_found, 2);

        let dormido = &results[&profiles[1].id];
        assert!(!dormido.success);
        assert_eq!(dormido.message, MSG_PROFILE_INACTIVE);

        let vacio = &results[&profiles[2].id];
        assert!(!vacio.success);
        assert_eq!(vacio.message, MSG_PROFILE_NO_CRITERIA);
    }

    #[tokio::test]
    async fn connect_failure_fans_out_to_every_profile() {
        let mut connector = MockConnector::new(Vec::new());
        connector.fail_with = Some(ConnectError::AuthenticationFailed);
        let mut client = MailSearchClient::new(connector);

        let profiles = vec![
            profile("Uno", "Factura", true),
            profile("Dos", "Recibo", true),
        ];
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let results = client
            .search_many_profiles(&credentials(), &profiles, since)
            .await;

        assert_eq!(results.len(), 2);
        for profile in &profiles {
            let result = &results[&profile.id];
            assert!(!result.success);
            assert_eq!(result.message, ConnectError::AuthenticationFailed.to_string());
        }
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let connector = MockConnector::new(Vec::new());
        let closes = Arc::clone(&connector.closes);
        let mut client = MailSearchClient::new(connector);
        client.connect(&credentials()).await.unwrap();

        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
