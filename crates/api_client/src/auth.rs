//! Saved API credentials.
//!
//! One JSON file, `<config dir>/casegrid/auth.json`, readable only by the
//! owner on Unix. `casegrid login` writes it, `logout` removes it, and every
//! command that talks to the API reads it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthCredentials {
    pub token: String,
    /// Server the token was issued by, without a trailing slash.
    pub api_base: String,
}

impl AuthCredentials {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Location of the credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// The per-user store. `None` when the platform has no config directory.
    pub fn user() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::at(dir.join("casegrid").join("auth.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved credentials. A missing, unreadable or malformed file counts as
    /// logged out.
    pub fn load(&self) -> Option<AuthCredentials> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(creds) => Some(creds),
            Err(e) => {
                log::warn!("ignoring invalid auth file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Write `creds`, replacing any saved token.
    pub fn save(&self, creds: &AuthCredentials) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let contents = serde_json::to_string_pretty(creds)
            .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

        let mut file = open_private(&self.path)
            .map_err(|e| format!("Failed to open {}: {}", self.path.display(), e))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))?;
        log::debug!("saved credentials for {} to {}", creds.api_base, self.path.display());
        Ok(())
    }

    /// Remove the saved token. Returns whether there was one.
    pub fn clear(&self) -> Result<bool, String> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(format!("Failed to delete {}: {}", self.path.display(), e)),
        }
    }
}

/// Truncating open with owner-only permissions, also on an existing file.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_store_is_under_casegrid() {
        let store = CredentialStore::user().unwrap();
        assert!(store.path().ends_with("casegrid/auth.json"));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let creds = AuthCredentials::new("tok", "https://qa.example.com/");
        assert_eq!(creds.api_base, "https://qa.example.com");
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("casegrid").join("auth.json"));
        assert!(store.load().is_none());

        let creds = AuthCredentials::new("tok123", "https://qa.example.com");
        store.save(&creds).unwrap();
        assert_eq!(store.load(), Some(creds));

        let replacement = AuthCredentials::new("tok456", "https://qa.example.com");
        store.save(&replacement).unwrap();
        assert_eq!(store.load(), Some(replacement));

        assert_eq!(store.clear(), Ok(true));
        assert_eq!(store.clear(), Ok(false));
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_file_is_made_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        CredentialStore::at(&path)
            .save(&AuthCredentials::new("tok", "http://localhost:8000"))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_malformed_file_counts_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        fs::write(&path, r#"{"token": 5}"#).unwrap();

        assert!(CredentialStore::at(&path).load().is_none());
    }
}
