//! File-backed install id.

use beacon_core::IdentityProvider;
use std::path::{Path, PathBuf};

/// An install id kept in a file so the client id survives restarts.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    id: String,
    path: PathBuf,
}

impl FileIdentity {
    /// Load the id from `path`, or generate and save a new one.
    ///
    /// If the file can be neither read nor written the id is fresh for this
    /// run only.
    pub fn load_or_create(path: &Path) -> Self {
        let id = match load_or_create_install_id(path) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not persist install id, using a temporary one"
                );
                generate_install_id()
            }
        };

        Self {
            id,
            path: path.to_path_buf(),
        }
    }

    /// The install id to use, or `None` when a `client_id_seed` replaces it.
    ///
    /// With a seed the file is never read or created.
    pub fn unless_seeded(client_id_seed: Option<&str>, path: &Path) -> Option<Self> {
        match client_id_seed {
            Some(_) => None,
            None => Some(Self::load_or_create(path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityProvider for FileIdentity {
    fn stable_id(&self) -> String {
        self.id.clone()
    }
}

fn generate_install_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn load_or_create_install_id(path: &Path) -> std::io::Result<String> {
    if path.exists() {
        let id = std::fs::read_to_string(path)?;
        let id = id.trim();
        if uuid::Uuid::parse_str(id).is_ok() {
            return Ok(id.to_string());
        }
        tracing::warn!(path = %path.display(), "Install id file is corrupt, replacing it");
    }

    let id = generate_install_id();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, &id)?;
    Ok(id)
}
