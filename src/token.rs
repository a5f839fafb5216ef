use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{debug, warn};

/// Chosen once at construction; call sites never branch on platform support.
#[derive(Debug)]
enum StorageBackend {
    File(PathBuf),
    Memory,
}

/// Single source of truth for the bearer credential.
///
/// The in-memory value is authoritative for the lifetime of the process;
/// storage I/O failures are logged and swallowed, so a failed write only costs
/// a re-login after the next restart. No retries by design.
pub struct TokenStore {
    token: RwLock<Option<String>>,
    backend: StorageBackend,
}

impl TokenStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        let backend = match path {
            Some(path) => match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => {
                    match std::fs::create_dir_all(dir) {
                        Ok(()) => StorageBackend::File(path),
                        Err(err) => {
                            warn!(
                                error = %err,
                                dir = %dir.display(),
                                "token storage unavailable; credential will not survive a restart"
                            );
                            StorageBackend::Memory
                        }
                    }
                }
                _ => StorageBackend::File(path),
            },
            None => StorageBackend::Memory,
        };

        Self {
            token: RwLock::new(None),
            backend,
        }
    }

    /// Loads the persisted credential into memory. Must be awaited before the
    /// first authenticated request; a missing file is a no-op.
    pub async fn initialize(&self) {
        let StorageBackend::File(path) = &self.backend else {
            return;
        };

        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if !token.is_empty() {
                    *self.write_lock() = Some(token);
                    debug!("loaded persisted credential");
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(error = %err, "failed to read persisted credential"),
        }
    }

    /// Overwrites any prior credential, in memory and in storage.
    pub async fn save(&self, token: &str) {
        *self.write_lock() = Some(token.to_string());

        if let StorageBackend::File(path) = &self.backend {
            if let Err(err) = tokio::fs::write(path, token).await {
                warn!(error = %err, "failed to persist credential");
            }
        }
    }

    /// Removes the credential from memory and storage; idempotent.
    pub async fn clear(&self) {
        *self.write_lock() = None;

        if let StorageBackend::File(path) = &self.backend {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(error = %err, "failed to remove persisted credential"),
            }
        }
    }

    /// In-memory read; never performs I/O.
    pub fn current(&self) -> Option<String> {
        self.token.read().expect("token lock poisoned").clone()
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.token.write().expect("token lock poisoned")
    }
}
