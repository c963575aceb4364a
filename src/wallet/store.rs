use super::identity::Identity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

const IDENTITY_FILE_EXTENSION: &str = "id";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid wallet label {0:?}")]
    InvalidLabel(String),
    #[error("wallet I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt identity file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode identity {label}: {source}")]
    Encode {
        label: String,
        source: serde_json::Error,
    },
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Identities keyed by label.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn put(&self, label: &str, identity: &Identity) -> WalletResult<()>;
    async fn get(&self, label: &str) -> WalletResult<Option<Identity>>;
    async fn list(&self) -> WalletResult<Vec<String>>;
    async fn remove(&self, label: &str) -> WalletResult<bool>;
}

fn check_label(label: &str) -> WalletResult<()> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && !label.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(WalletError::InvalidLabel(label.to_string()))
    }
}

/// One `<label>.id` JSON file per identity.
pub struct FileSystemWallet {
    root: PathBuf,
}

impl FileSystemWallet {
    pub async fn open(root: impl Into<PathBuf>) -> WalletResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| WalletError::Io {
                path: root.clone(),
                source,
            })?;
        log::debug!("Opened wallet at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, label: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", label, IDENTITY_FILE_EXTENSION))
    }
}

#[async_trait]
impl WalletStore for FileSystemWallet {
    async fn put(&self, label: &str, identity: &Identity) -> WalletResult<()> {
        check_label(label)?;
        let path = self.path_for(label);
        let contents = serde_json::to_vec_pretty(identity).map_err(|source| WalletError::Encode {
            label: label.to_string(),
            source,
        })?;
        // Readers only ever see a complete file.
        let staging = path.with_extension(format!("{}.tmp", IDENTITY_FILE_EXTENSION));
        if let Err(source) = tokio::fs::write(&staging, contents).await {
            return Err(WalletError::Io {
                path: staging,
                source,
            });
        }
        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(WalletError::Io { path, source });
        }
        Ok(())
    }

    async fn get(&self, label: &str) -> WalletResult<Option<Identity>> {
        check_label(label)?;
        let path = self.path_for(label);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(WalletError::Io { path, source }),
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|source| WalletError::Corrupt { path, source })
    }

    async fn list(&self) -> WalletResult<Vec<String>> {
        let io_err = |source| WalletError::Io {
            path: self.root.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut labels = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(IDENTITY_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                labels.push(stem.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }

    async fn remove(&self, label: &str) -> WalletResult<bool> {
        check_label(label)?;
        let path = self.path_for(label);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(WalletError::Io { path, source }),
        }
    }
}

#[derive(Default)]
pub struct InMemoryWallet {
    identities: RwLock<HashMap<String, Identity>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWallet {
    async fn put(&self, label: &str, identity: &Identity) -> WalletResult<()> {
        check_label(label)?;
        self.identities
            .write()
            .await
            .insert(label.to_string(), identity.clone());
        Ok(())
    }

    async fn get(&self, label: &str) -> WalletResult<Option<Identity>> {
        check_label(label)?;
        Ok(self.identities.read().await.get(label).cloned())
    }

    async fn list(&self) -> WalletResult<Vec<String>> {
        let mut labels: Vec<String> = self.identities.read().await.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }

    async fn remove(&self, label: &str) -> WalletResult<bool> {
        check_label(label)?;
        Ok(self.identities.write().await.remove(label).is_some())
    }
}
