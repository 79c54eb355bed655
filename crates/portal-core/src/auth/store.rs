use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::models::SessionTokens;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

/// A string key/value backend.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
    /// Human-readable backend name, for status output.
    fn describe(&self) -> String;
}

/// Process-local store. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// JSON object on disk, one string value per key.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    /// Store at `tokens.json` inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse token file: {}", self.path.display()))
    }

    /// Like `read_all`, but an unparseable file reads as empty so the next
    /// write replaces it. The flag is set when the contents were discarded.
    fn read_for_update(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.read_all() {
            Ok(values) => Ok((values, false)),
            Err(e) if self.path.exists() => {
                warn!(error = %format!("{:#}", e), "Discarding unreadable token file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the file contents. Writes a sibling temp file and renames it
    /// over the target so readers never see a partial file.
    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if values.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove token file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open token file: {}", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .context("Failed to write token file")?;
        file.sync_all().context("Failed to flush token file")?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace token file: {}", self.path.display()))?;
        Ok(())
    }

    fn locked<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| anyhow!("File store lock poisoned"))?;
        f()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.locked(|| Ok(self.read_all()?.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.locked(|| {
            let (mut values, _) = self.read_for_update()?;
            values.insert(key.to_string(), value.to_string());
            self.write_all(&values)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.locked(|| {
            let (mut values, discarded) = self.read_for_update()?;
            if values.remove(key).is_some() || discarded {
                self.write_all(&values)?;
            }
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("file ({})", self.path.display())
    }
}

/// The persisted access/refresh token pair.
///
/// Clone is cheap and clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Load the token pair. A half-present pair is cleared and reads as absent.
    pub fn load(&self) -> Result<Option<SessionTokens>> {
        let access = self.backend.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.backend.get(REFRESH_TOKEN_KEY)?;
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(SessionTokens::new(access, refresh))),
            (None, None) => Ok(None),
            _ => {
                warn!("Partial token state found, clearing");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.backend.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.backend.get(REFRESH_TOKEN_KEY)
    }

    pub fn has_tokens(&self) -> Result<bool> {
        Ok(self.load()?.is_some())
    }

    pub fn save(&self, tokens: &SessionTokens) -> Result<()> {
        self.backend.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.backend.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        debug!(backend = %self.backend.describe(), "Tokens saved");
        Ok(())
    }

    /// Remove both tokens. Attempts both removals even if the first fails.
    pub fn clear(&self) -> Result<()> {
        let access = self.backend.remove(ACCESS_TOKEN_KEY);
        let refresh = self.backend.remove(REFRESH_TOKEN_KEY);
        debug!(backend = %self.backend.describe(), "Tokens cleared");
        access.and(refresh)
    }

    pub fn backend_name(&self) -> String {
        self.backend.describe()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("backend", &self.backend.describe())
            .finish()
    }
}
