use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use relay_logging::relay_warn;
use tempfile::NamedTempFile;

use crate::auth::TokenStore;

/// Token store backed by a single file, written atomically (temp file
/// then rename) so a crash never leaves a half-written credential.
///
/// All operations are best-effort: a failed write or delete is logged at
/// warn level and otherwise swallowed, mirroring the fire-and-forget
/// semantics of the storage it replaces.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let text = fs::read_to_string(&self.path).ok()?;
        let token = text.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_owned())
        }
    }

    fn set(&self, token: &str) {
        if let Err(err) = write_atomic(&self.path, token) {
            relay_warn!("failed to persist token to {:?}: {}", self.path, err);
        }
    }

    fn remove(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                relay_warn!("failed to remove token file {:?}: {}", self.path, err);
            }
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
