//! Token store trait and implementations

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;

use crate::error::{Result, SessionError};
use crate::models::TokenPair;

/// Durable persistence of the current token pair.
///
/// The pair is written and cleared as a unit; a reader never observes an
/// access token from one pair next to the refresh token of another.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the persisted pair, if any
    async fn load(&self) -> Result<Option<TokenPair>>;

    /// Replace the persisted pair
    async fn save(&self, tokens: &TokenPair) -> Result<()>;

    /// Remove both tokens
    async fn clear(&self) -> Result<()>;
}

/// JSON file on disk holding `{"accessToken": ..., "refreshToken": ...}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<TokenPair>(&contents) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                tracing::warn!("Discarding unreadable token file {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write-then-rename so a crash never leaves half a pair behind.
        let staging = self.staging_path();
        let contents = serde_json::to_string_pretty(tokens)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        fs::write(&staging, contents).await?;
        fs::rename(&staging, &self.path).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    /// Synchronous peek, handy for assertions
    pub fn snapshot(&self) -> Option<TokenPair> {
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self.snapshot())
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        *self
            .tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self
            .tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}
