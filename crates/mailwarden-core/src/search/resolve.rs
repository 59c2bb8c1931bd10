//! Mailbox server resolution.
//!
//! Stored credentials carry the outgoing (SMTP) server; searching needs the
//! provider's IMAP host. Known providers are mapped directly, anything else
//! falls back to the conventional `smtp.` to `imap.` prefix rewrite.

use tracing::debug;

use super::session::ConnectError;

/// Exact mappings from outgoing host to IMAP host for common providers.
const PROVIDER_MAP: &[(&str, &str)] = &[
    ("smtp.gmail.com", "imap.gmail.com"),
    ("smtp-mail.outlook.com", "outlook.office365.com"),
    ("smtp.office365.com", "outlook.office365.com"),
    ("smtp.mail.yahoo.com", "imap.mail.yahoo.com"),
];

/// Looser domain-substring mappings tried after the exact table.
const DOMAIN_MAP: &[(&str, &str)] = &[
    ("gmail", "imap.gmail.com"),
    ("outlook", "outlook.office365.com"),
    ("yahoo", "imap.mail.yahoo.com"),
    ("office365", "outlook.office365.com"),
];

/// Default IMAP-over-TLS port.
pub const IMAP_TLS_PORT: u16 = 993;

/// Derive the IMAP host from a configured outgoing server host.
///
/// # Errors
///
/// Returns `UnresolvableServer` when the host is blank or follows no
/// recognizable convention.
pub fn resolve_mailbox_host(outgoing_host: &str) -> Result<String, ConnectError> {
    let host = outgoing_host.trim().to_lowercase();
    if host.is_empty() {
        return Err(ConnectError::UnresolvableServer(outgoing_host.to_string()));
    }

    for (smtp, imap) in PROVIDER_MAP {
        if host == *smtp {
            debug!(from = %host, to = %imap, "resolved mailbox host via provider map");
            return Ok((*imap).to_string());
        }
    }
    for (domain, imap) in DOMAIN_MAP {
        if host.contains(domain) {
            debug!(from = %host, to = %imap, "resolved mailbox host via domain match");
            return Ok((*imap).to_string());
        }
    }

    if let Some(rest) = host.strip_prefix("smtp.") {
        let resolved = format!("imap.{rest}");
        debug!(from = %host, to = %resolved, "resolved mailbox host by prefix rewrite");
        return Ok(resolved);
    }
    if host.starts_with("imap.") {
        return Ok(host);
    }

    Err(ConnectError::UnresolvableServer(outgoing_host.to_string()))
}
