//! Access token acquisition.
//!
//! Sign-in itself happens in provider SDKs outside this crate. They hand the
//! resulting token to a [`CredentialStore`]; this module only knows how to get
//! a fresh token back when the backend says the current one has expired.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::BoatTrackerError;
use crate::keychain::CredentialStore;

/// Current access token, shared between the HTTP client and the socket loop
/// so a refresh made by one is picked up by the other
pub type SharedToken = Arc<RwLock<Option<String>>>;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a fresh access token without user interaction
    async fn refresh_silently(&self) -> Result<String, BoatTrackerError>;
}

/// Picks up the token most recently saved for a backend host
pub struct StoredTokenProvider {
    store: Arc<dyn CredentialStore>,
    host: String,
}

impl StoredTokenProvider {
    pub fn new(store: Arc<dyn CredentialStore>, host: impl Into<String>) -> Self {
        Self {
            store,
            host: host.into(),
        }
    }

    /// Token to start with, if any has been saved
    pub async fn current(&self) -> Result<Option<String>, BoatTrackerError> {
        self.store.read(&self.host).await
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn refresh_silently(&self) -> Result<String, BoatTrackerError> {
        info!("Reloading access token for {}", self.host);
        self.store
            .read(&self.host)
            .await?
            .ok_or_else(|| BoatTrackerError::MissingCredentials(self.host.clone()))
    }
}
