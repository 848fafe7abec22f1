//! Loading and generating the 256-bit master key (`spec.md` §4.2).

use std::fs;
use std::path::Path;

use rand::RngCore;
use rand::rngs::OsRng;

use keenbench_error::{EngineError, ErrorCode};

/// Size of the AES-256 master key, in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// A 256-bit symmetric key used to encrypt `secrets.enc`.
#[derive(Clone)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    /// Wrap raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.0
    }

    /// Load the master key from `path`, generating and persisting a new
    /// random one if the file does not exist yet.
    ///
    /// On Unix the file is created with mode `0600`; an existing file with
    /// looser permissions is left as-is (ownership is the caller's to fix).
    pub fn load_or_create(path: &Path) -> Result<Self, EngineError> {
        match fs::read(path) {
            Ok(bytes) => {
                let arr: [u8; MASTER_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
                    EngineError::new(
                        ErrorCode::InvariantViolation,
                        format!(
                            "master key at {} has {} bytes, expected {MASTER_KEY_LEN}",
                            path.display(),
                            bytes.len()
                        ),
                    )
                })?;
                Ok(Self(arr))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::generate_and_save(path),
            Err(e) => Err(EngineError::new(
                ErrorCode::FileReadFailed,
                format!("failed to read master key at {}: {e}", path.display()),
            )
            .with_source(e)),
        }
    }

    fn generate_and_save(path: &Path) -> Result<Self, EngineError> {
        let mut bytes = [0u8; MASTER_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::new(
                    ErrorCode::FileWriteFailed,
                    format!("failed to create {}: {e}", parent.display()),
                )
                .with_source(e)
            })?;
        }

        fs::write(path, bytes).map_err(|e| {
            EngineError::new(
                ErrorCode::FileWriteFailed,
                format!("failed to write master key to {}: {e}", path.display()),
            )
            .with_source(e)
        })?;

        restrict_permissions(path)?;

        tracing::info!(path = %path.display(), "generated new master key");
        Ok(Self(bytes))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        EngineError::new(
            ErrorCode::FileWriteFailed,
            format!(
                "failed to restrict permissions on {}: {e}",
                path.display()
            ),
        )
        .with_source(e)
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), EngineError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_and_persists_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        assert!(!path.exists());

        let key1 = MasterKey::load_or_create(&path).unwrap();
        assert!(path.exists());

        let key2 = MasterKey::load_or_create(&path).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn two_fresh_keys_differ() {
        let dir1 = tempdir().unwrap();
        let dir2 = tempdir().unwrap();
        let key1 = MasterKey::load_or_create(&dir1.path().join("master.key")).unwrap();
        let key2 = MasterKey::load_or_create(&dir2.path().join("master.key")).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn generated_key_file_is_mode_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        MasterKey::load_or_create(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn rejects_corrupt_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        fs::write(&path, b"too short").unwrap();
        let err = MasterKey::load_or_create(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolation);
    }
}
