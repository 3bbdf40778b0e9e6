use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::CredentialError;

/// Where credentials live. Lookup by name, `Ok(None)` when the store has no
/// entry for it.
pub trait SecretStore: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Option<String>, String>;

    /// Tells the user where to configure `name` in this store.
    fn setup_hint(&self, name: &str) -> String;
}

/// Fetch a credential, failing loudly when it is absent or blank.
/// Never retries.
pub fn load_credential(store: &dyn SecretStore, name: &str) -> Result<String, CredentialError> {
    match store.lookup(name) {
        Ok(Some(value)) if !value.trim().is_empty() => {
            debug!(secret = name, "credential loaded");
            Ok(value)
        }
        Ok(_) => Err(CredentialError::Missing {
            key: name.to_string(),
            hint: store.setup_hint(name),
        }),
        Err(message) => Err(CredentialError::Retrieval {
            key: name.to_string(),
            message,
        }),
    }
}

// --- EnvSecretStore ---

/// Reads secrets from the process environment.
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn lookup(&self, name: &str) -> Result<Option<String>, String> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    fn setup_hint(&self, name: &str) -> String {
        format!("set it in the environment, e.g. `export {name}=<your key>`")
    }
}

// --- FileSecretStore ---

/// Reads secrets from a JSON object file: `{ "NAME": "value", ... }`.
/// A missing file is treated as an empty store.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretStore for FileSecretStore {
    fn lookup(&self, name: &str) -> Result<Option<String>, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("{}: {e}", self.path.display())),
        };

        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|e| format!("{}: invalid JSON: {e}", self.path.display()))?;

        match parsed.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(format!("{}: `{name}` is not a string", self.path.display())),
        }
    }

    fn setup_hint(&self, name: &str) -> String {
        format!(
            "add `\"{name}\": \"<your key>\"` to the JSON object in {}",
            self.path.display()
        )
    }
}

// --- StaticSecretStore ---

/// In-memory secrets, for embedding the agent or for tests.
#[derive(Default)]
pub struct StaticSecretStore {
    values: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn lookup(&self, name: &str) -> Result<Option<String>, String> {
        Ok(self.values.get(name).cloned())
    }

    fn setup_hint(&self, name: &str) -> String {
        format!("register `{name}` on the secret store before starting the agent")
    }
}
