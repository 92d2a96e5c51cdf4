use crate::models::Credentials;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Namespace holding the last successful login
pub const LOGIN_NAMESPACE: &str = "login";
pub const KEY_USERNAME: &str = "u";
pub const KEY_SECRET: &str = "p";
pub const KEY_REPOSITORY: &str = "r";

/// Errors from reading or writing a preference namespace
#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Failed to access preference file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse preference file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),
}

/// Simple string key-value store, one map per namespace.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Write several keys at once; existing keys not named are kept.
    fn put(&self, namespace: &str, entries: &[(&str, &str)]) -> Result<(), PreferenceError>;
}

/// YAML-backed store: `<root>/<namespace>.yaml`.
#[derive(Debug, Clone)]
pub struct YamlPreferenceStore {
    root: Utf8PathBuf,
}

impl YamlPreferenceStore {
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn namespace_path(&self, namespace: &str) -> Utf8PathBuf {
        self.root.join(format!("{namespace}.yaml"))
    }

    fn load(&self, namespace: &str) -> Result<IndexMap<String, String>, PreferenceError> {
        let path = self.namespace_path(namespace);
        if !path.exists() {
            return Ok(IndexMap::new());
        }
        let contents = fs::read_to_string(&path).map_err(|source| PreferenceError::Io {
            path: path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(IndexMap::new());
        }
        serde_yaml_ng::from_str(&contents).map_err(|source| PreferenceError::Parse { path, source })
    }
}

impl PreferenceStore for YamlPreferenceStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.load(namespace)?.shift_remove(key))
    }

    fn put(&self, namespace: &str, entries: &[(&str, &str)]) -> Result<(), PreferenceError> {
        let mut map = self.load(namespace)?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }

        let io_err = |path: &Utf8Path| {
            let path = path.to_path_buf();
            move |source| PreferenceError::Io { path, source }
        };
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;

        let path = self.namespace_path(namespace);
        let yaml = serde_yaml_ng::to_string(&map)?;
        fs::write(&path, yaml).map_err(io_err(&path))?;

        tracing::debug!("Saved {} preference key(s) to {}", entries.len(), path);
        Ok(())
    }
}

/// In-memory store for tests and ephemeral hosts. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    namespaces: Arc<Mutex<IndexMap<String, IndexMap<String, String>>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one namespace
    pub fn namespace(&self, namespace: &str) -> IndexMap<String, String> {
        self.namespaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.namespace(namespace).get(key).cloned())
    }

    fn put(&self, namespace: &str, entries: &[(&str, &str)]) -> Result<(), PreferenceError> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        let map = namespaces.entry(namespace.to_string()).or_default();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

/// Login credentials kept for pre-filling the form.
///
/// Written only after a successful session, read only when the flow starts.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn PreferenceStore>,
}

/// Pre-fill values; `None` means the key was never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPrefill {
    pub username: Option<String>,
    pub secret: Option<String>,
    pub repository: Option<String>,
}

impl CredentialPrefill {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.secret.is_none() && self.repository.is_none()
    }

    /// Apply onto the current field texts, leaving fields without a value untouched.
    pub fn apply_to(&self, fields: &mut Credentials) {
        if let Some(u) = &self.username {
            fields.username = u.clone();
        }
        if let Some(p) = &self.secret {
            fields.secret = p.clone();
        }
        if let Some(r) = &self.repository {
            fields.repository = r.clone();
        }
    }
}

impl CredentialStore {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn prefill(&self) -> Result<CredentialPrefill, PreferenceError> {
        Ok(CredentialPrefill {
            username: self.store.get(LOGIN_NAMESPACE, KEY_USERNAME)?,
            secret: self.store.get(LOGIN_NAMESPACE, KEY_SECRET)?,
            repository: self.store.get(LOGIN_NAMESPACE, KEY_REPOSITORY)?,
        })
    }

    pub fn persist(&self, credentials: &Credentials) -> Result<(), PreferenceError> {
        self.store.put(
            LOGIN_NAMESPACE,
            &[
                (KEY_USERNAME, &credentials.username),
                (KEY_SECRET, &credentials.secret),
                (KEY_REPOSITORY, &credentials.repository),
            ],
        )
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (YamlPreferenceStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().join("prefs")).unwrap();
        (YamlPreferenceStore::new(root), temp_dir)
    }

    #[test]
    fn test_missing_namespace_reads_none() {
        let (store, _tmp) = temp_store();
        assert_eq!(store.get("login", "u").unwrap(), None);
    }

    #[test]
    fn test_put_merges_keys() {
        let (store, _tmp) = temp_store();
        store.put("login", &[("u", "alice")]).unwrap();
        store.put("login", &[("r", "fly")]).unwrap();

        assert_eq!(store.get("login", "u").unwrap().as_deref(), Some("alice"));
        assert_eq!(store.get("login", "r").unwrap().as_deref(), Some("fly"));
        assert!(store.namespace_path("login").exists());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let (store, _tmp) = temp_store();
        fs::create_dir_all(store.namespace_path("x").parent().unwrap()).unwrap();
        fs::write(store.namespace_path("x"), "[not, a, map").unwrap();

        assert!(matches!(
            store.get("x", "k"),
            Err(PreferenceError::Parse { .. })
        ));
    }

    #[test]
    fn test_credential_round_trip() {
        let memory = MemoryPreferenceStore::new();
        let creds = CredentialStore::new(Arc::new(memory.clone()));

        assert!(creds.prefill().unwrap().is_empty());

        creds
            .persist(&Credentials::new("alice", "pw", "h:1/fly"))
            .unwrap();

        let prefill = creds.prefill().unwrap();
        assert_eq!(prefill.username.as_deref(), Some("alice"));
        assert_eq!(memory.namespace(LOGIN_NAMESPACE).len(), 3);
    }

    #[test]
    fn test_prefill_leaves_missing_fields() {
        let prefill = CredentialPrefill {
            username: Some("bob".into()),
            ..Default::default()
        };
        let mut fields = Credentials::new("", "typed", "");
        prefill.apply_to(&mut fields);
        assert_eq!(fields, Credentials::new("bob", "typed", ""));
    }
}
