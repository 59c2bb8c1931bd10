//! Account and delivery configuration, persisted as flat JSON files.

mod credentials;
mod delivery;

pub use credentials::{CredentialStore, MailCredentials};
pub use delivery::{DeliveryConfig, DeliveryConfigStore};
