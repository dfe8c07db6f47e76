use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::ErrorKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid filename: {0:?}")]
    InvalidName(String),
    #[error("destination is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Save directory that every derived destination must stay inside.
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Resolves the destination for a client-declared filename.
    ///
    /// Only the final component of `declared` is used. The result is always a
    /// direct child of the root and is never an existing symlink or directory.
    pub async fn destination_for(
        &self,
        declared: &str,
        identity: &str,
    ) -> Result<PathBuf, StorageError> {
        let name = derive_file_name(declared, identity)?;
        let target = self.root.join(&name);
        if target.parent() != Some(self.root.as_path()) {
            return Err(StorageError::InvalidName(declared.to_string()));
        }
        ensure_plain_leaf(&target).await?;
        Ok(target)
    }
}

/// Rejects destinations that already exist as a symlink or a directory.
async fn ensure_plain_leaf(target: &Path) -> Result<(), StorageError> {
    match fs::symlink_metadata(target).await {
        Ok(metadata) => {
            let file_type = metadata.file_type();
            if file_type.is_symlink() || file_type.is_dir() {
                return Err(StorageError::NotAFile(target.to_path_buf()));
            }
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::Io(err)),
    }
}

/// Reduces an untrusted filename to its last path component.
///
/// Both `/` and `\` count as separators so Windows-style names are handled
/// the same way on every platform.
pub fn sanitize_file_name(declared: &str) -> Result<&str, StorageError> {
    let base = declared.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(StorageError::InvalidName(declared.to_string()));
    }
    Ok(base)
}

/// Splits a filename into stem and extension at the last dot.
///
/// A leading dot does not start an extension (`.gitignore` is all stem), and
/// neither does a trailing one (`notes.` is all stem).
pub fn split_stem_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Builds the stored filename: `{identity}_{stem}{extension}`, or the
/// sanitized name unchanged when the identity is empty.
pub fn derive_file_name(declared: &str, identity: &str) -> Result<String, StorageError> {
    let base = sanitize_file_name(declared)?;
    if identity.is_empty() {
        return Ok(base.to_string());
    }
    let (stem, extension) = split_stem_extension(base);
    Ok(format!("{identity}_{stem}{extension}"))
}
