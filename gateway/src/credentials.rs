use crate::config::CredentialStoreType;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// A registered caller. Looked up by access key only; the secret is used to
/// recompute request signatures and never leaves the gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Read-only lookup of registered credentials.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, access_key: &str) -> Option<Credential>;
}

#[derive(thiserror::Error, Debug)]
pub enum CredentialStoreError {
    #[error("could not read credentials file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse credentials file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Credentials loaded once at startup and kept in memory.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    keys: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new(keys: HashMap<String, String>) -> Self {
        StaticCredentialStore { keys }
    }

    /// Loads a YAML file of `access_key: secret_key` pairs.
    pub fn from_file(path: &Path) -> Result<Self, CredentialStoreError> {
        let file = File::open(path)?;
        let keys: HashMap<String, String> = serde_yaml::from_reader(file)?;
        Ok(StaticCredentialStore::new(keys))
    }

    pub fn from_config(store: &CredentialStoreType) -> Result<Self, CredentialStoreError> {
        match store {
            CredentialStoreType::Inline { keys } => Ok(StaticCredentialStore::new(keys.clone())),
            CredentialStoreType::File { path } => StaticCredentialStore::from_file(path),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self, access_key: &str) -> Option<Credential> {
        self.keys.get(access_key).map(|secret| Credential {
            access_key: access_key.to_string(),
            secret_key: secret.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup() {
        let store =
            StaticCredentialStore::new(HashMap::from([("AKID".to_string(), "secret".to_string())]));
        let credential = store.lookup("AKID").expect("registered key");
        assert_eq!(credential.secret_key, "secret");
        assert!(store.lookup("secret").is_none());
        assert!(!format!("{credential:?}").contains("secret\""));
    }

    #[test]
    fn test_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "AKID1: one\nAKID2: two\n").expect("write yaml");

        let store = StaticCredentialStore::from_config(&CredentialStoreType::File {
            path: tmp.path().to_path_buf(),
        })
        .expect("load store");
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("AKID2").unwrap().secret_key, "two");
    }

    #[test]
    fn test_from_malformed_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "keys:\n  AKID1: one\n").expect("write yaml");

        let result = StaticCredentialStore::from_file(tmp.path());
        assert!(matches!(result, Err(CredentialStoreError::Parse(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = StaticCredentialStore::from_file(Path::new("/nonexistent/keys.yaml"));
        assert!(matches!(result, Err(CredentialStoreError::Io(_))));
    }
}
