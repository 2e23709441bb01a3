//! Access token storage, one token per backend host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::BoatTrackerError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn read(&self, host: &str) -> Result<Option<String>, BoatTrackerError>;

    /// Store a token, failing if one is already stored for the host
    async fn add(&self, host: &str, token: &str) -> Result<(), BoatTrackerError>;

    /// Replace a stored token, failing if none is stored for the host
    async fn update(&self, host: &str, token: &str) -> Result<(), BoatTrackerError>;

    /// Remove the token for the host. Removing a missing token is not an error.
    async fn delete(&self, host: &str) -> Result<(), BoatTrackerError>;

    /// Delete then save, as one step
    async fn use_token(&self, host: &str, token: &str) -> Result<(), BoatTrackerError>;
}

fn add_to(tokens: &mut HashMap<String, String>, host: &str, token: &str) -> Result<(), BoatTrackerError> {
    if tokens.contains_key(host) {
        return Err(BoatTrackerError::DuplicateCredentials(host.to_string()));
    }
    tokens.insert(host.to_string(), token.to_string());
    Ok(())
}

fn update_in(tokens: &mut HashMap<String, String>, host: &str, token: &str) -> Result<(), BoatTrackerError> {
    match tokens.get_mut(host) {
        Some(stored) => {
            *stored = token.to_string();
            Ok(())
        }
        None => Err(BoatTrackerError::MissingCredentials(host.to_string())),
    }
}

fn replace_in(tokens: &mut HashMap<String, String>, host: &str, token: &str) -> Result<(), BoatTrackerError> {
    tokens.remove(host);
    add_to(tokens, host, token)
}

/// Tokens kept in a JSON file. Every operation holds the lock for its whole
/// read-modify-write cycle.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using credentials file {}", path.display());
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, BoatTrackerError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, tokens: &HashMap<String, String>) -> Result<(), BoatTrackerError> {
        let bytes = serde_json::to_vec_pretty(tokens)?;
        // Write beside the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn modify<F>(&self, op: F) -> Result<(), BoatTrackerError>
    where
        F: FnOnce(&mut HashMap<String, String>) -> Result<(), BoatTrackerError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut tokens = self.load().await?;
        op(&mut tokens)?;
        self.save(&tokens).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn read(&self, host: &str) -> Result<Option<String>, BoatTrackerError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(host))
    }

    async fn add(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        self.modify(|tokens| add_to(tokens, host, token)).await
    }

    async fn update(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        self.modify(|tokens| update_in(tokens, host, token)).await
    }

    async fn delete(&self, host: &str) -> Result<(), BoatTrackerError> {
        debug!("Deleting credentials for {}", host);
        self.modify(|tokens| {
            tokens.remove(host);
            Ok(())
        })
        .await
    }

    async fn use_token(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        self.modify(|tokens| replace_in(tokens, host, token)).await
    }
}

/// Tokens kept in memory only
#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn read(&self, host: &str) -> Result<Option<String>, BoatTrackerError> {
        Ok(self.tokens.lock().await.get(host).cloned())
    }

    async fn add(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        add_to(&mut *self.tokens.lock().await, host, token)
    }

    async fn update(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        update_in(&mut *self.tokens.lock().await, host, token)
    }

    async fn delete(&self, host: &str) -> Result<(), BoatTrackerError> {
        self.tokens.lock().await.remove(host);
        Ok(())
    }

    async fn use_token(&self, host: &str, token: &str) -> Result<(), BoatTrackerError> {
        replace_in(&mut *self.tokens.lock().await, host, token)
    }
}
