//! Bearer token session
//!
//! The token is the only client state persisted between invocations. It lives
//! in a single file (mode 0600 on unix) and is handed to the transport via
//! this object rather than read from ambient global state.

use pqtk_common::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Session {
    token_file: Option<PathBuf>,
    token: Option<String>,
}

impl Session {
    /// Session backed by `token_file`; a missing file means logged out
    pub fn load(token_file: impl Into<PathBuf>) -> Result<Self> {
        let token_file = token_file.into();
        let token = if token_file.exists() {
            let raw = std::fs::read_to_string(&token_file)?;
            Some(raw.trim().to_string()).filter(|t| !t.is_empty())
        } else {
            None
        };
        debug!(
            path = %token_file.display(),
            authenticated = token.is_some(),
            "Loaded session"
        );
        Ok(Self {
            token_file: Some(token_file),
            token,
        })
    }

    /// Session that is never written to disk
    pub fn ephemeral(token: Option<String>) -> Self {
        Self {
            token_file: None,
            token,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    /// Remember a freshly issued token
    pub fn store(&mut self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if let Some(path) = &self.token_file {
            write_private(path, &token)?;
            info!(path = %path.display(), "Stored session token");
        }
        self.token = Some(token);
        Ok(())
    }

    /// Forget the token (logout)
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.discard_file()
    }

    /// Remove the persisted token so later invocations start logged out
    ///
    /// The in-memory token is kept for the rest of this process.
    pub fn discard_file(&self) -> Result<()> {
        if let Some(path) = &self.token_file {
            if path.exists() {
                std::fs::remove_file(path)?;
                info!(path = %path.display(), "Removed session token");
            }
        }
        Ok(())
    }
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let session = Session::load(dir.path().join("token")).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_store_then_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("token");

        let mut session = Session::load(&path).unwrap();
        session.store("abc123").unwrap();
        assert_eq!(session.token(), Some("abc123"));

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.token(), Some("abc123"));

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        assert!(!path.exists());
        assert!(!Session::load(&path).unwrap().is_authenticated());
    }

    #[test]
    fn test_blank_file_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        assert!(!Session::load(&path).unwrap().is_authenticated());
    }

    #[test]
    fn test_ephemeral_never_touches_disk() {
        let mut session = Session::ephemeral(None);
        session.store("t").unwrap();
        assert_eq!(session.token(), Some("t"));
        assert!(session.token_file().is_none());
    }
}
