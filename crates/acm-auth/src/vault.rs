use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault save failed: {0}")]
    SaveFailed(#[source] io::Error),
    #[error("vault read failed: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("vault delete failed: {0}")]
    DeleteFailed(#[source] io::Error),
    #[error("vault record could not be encoded")]
    EncodingFailed,
}

/// Secure key-value store for session secrets.
///
/// The daemon ships a file-backed implementation; platform builds can
/// substitute an OS keychain behind the same trait.
pub trait CredentialVault: Send + Sync {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), VaultError>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, VaultError>;
    fn delete(&self, key: &str) -> Result<(), VaultError>;
}

/// One file per record under the vault directory, readable only by the
/// owning user.
pub struct FileVault {
    dir: PathBuf,
}

impl FileVault {
    /// Open (creating if needed) a vault rooted at `dir`.
    pub fn open(dir: PathBuf) -> Result<Self, VaultError> {
        fs::create_dir_all(&dir).map_err(VaultError::SaveFailed)?;
        Ok(Self { dir })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &std::path::Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &std::path::Path) -> io::Result<()> {
        Ok(())
    }
}

impl CredentialVault for FileVault {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), VaultError> {
        let path = self.record_path(key);
        fs::write(&path, bytes).map_err(VaultError::SaveFailed)?;
        Self::restrict_permissions(&path).map_err(VaultError::SaveFailed)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, VaultError> {
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::ReadFailed(e)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), VaultError> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::DeleteFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_vault() -> (tempfile::TempDir, FileVault) {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::open(dir.path().join("vault")).unwrap();
        (dir, vault)
    }

    #[test]
    fn open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault");
        FileVault::open(path.clone()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_load_roundtrip() {
        let (_dir, vault) = open_vault();
        vault.save("session_token", b"secret").unwrap();
        assert_eq!(vault.load("session_token").unwrap().unwrap(), b"secret");
    }

    #[test]
    fn load_missing_key_is_none() {
        let (_dir, vault) = open_vault();
        assert!(vault.load("missing").unwrap().is_none());
    }

    #[test]
    fn save_overwrites_existing() {
        let (_dir, vault) = open_vault();
        vault.save("k", b"one").unwrap();
        vault.save("k", b"two").unwrap();
        assert_eq!(vault.load("k").unwrap().unwrap(), b"two");
    }

    #[test]
    fn delete_removes_record() {
        let (_dir, vault) = open_vault();
        vault.save("k", b"v").unwrap();
        vault.delete("k").unwrap();
        assert!(vault.load("k").unwrap().is_none());
    }

    #[test]
    fn delete_missing_key_is_noop() {
        let (_dir, vault) = open_vault();
        vault.delete("never-existed").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn records_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, vault) = open_vault();
        vault.save("k", b"v").unwrap();
        let meta = fs::metadata(vault.record_path("k")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
