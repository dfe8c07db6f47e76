//! 临时写入与原子替换的辅助方法。

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::storage::StorageError;

/// 写入同目录临时文件，完成后重命名为目标文件。
///
/// 未调用 `finalize` 就被丢弃时（例如客户端断开导致处理 future 被取消），
/// 临时文件会被删除，目标文件保持原样。
pub struct AtomicFile {
    target: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl AtomicFile {
    /// 在目标路径同目录创建临时文件。
    pub async fn new(target: &Path) -> Result<Self, StorageError> {
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidName(target.display().to_string()))?;
        // Independent of the target name, which may already be near NAME_MAX.
        let temp_path = parent.join(format!(".upload.tmp.{}", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file: Some(file),
            written: 0,
        })
    }

    /// 追加写入一段数据。
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("temporary file already closed"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// 主动放弃并清理临时文件。
    pub async fn cleanup(mut self) {
        self.file.take();
        if let Err(err) = fs::remove_file(&self.temp_path).await {
            warn!(path = ?self.temp_path, error = %err, "failed to remove temporary upload file");
        }
        self.temp_path = PathBuf::new();
    }

    /// 同步并原子替换目标文件，返回写入的字节数。
    pub async fn finalize(mut self) -> Result<u64, StorageError> {
        if let Some(file) = self.file.take() {
            file.sync_all().await?;
        }

        if let Err(err) = fs::rename(&self.temp_path, &self.target).await {
            #[cfg(windows)]
            {
                if fs::remove_file(&self.target).await.is_ok() {
                    fs::rename(&self.temp_path, &self.target).await?;
                } else {
                    return Err(err.into());
                }
            }
            #[cfg(not(windows))]
            {
                return Err(err.into());
            }
        }

        // Renamed away; nothing left for Drop to remove.
        self.temp_path = PathBuf::new();
        Ok(self.written)
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.temp_path.as_os_str().is_empty() {
            return;
        }
        self.file.take();
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = ?self.temp_path, error = %err, "failed to remove abandoned upload file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[tokio::test]
    async fn finalize_replaces_target() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("a.txt");
        std::fs::write(&target, b"old contents").expect("write old");

        let mut atomic = AtomicFile::new(&target).await.expect("create");
        atomic.write(b"new").await.expect("write");
        let written = atomic.finalize().await.expect("finalize");

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&target).expect("read"), b"new");
        assert_eq!(entries(temp.path()), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn finalize_accepts_target_name_near_length_limit() {
        let temp = tempdir().expect("tempdir");
        let name = format!("{}.txt", "a".repeat(226));
        assert_eq!(name.len(), 230);
        let target = temp.path().join(&name);

        let mut atomic = AtomicFile::new(&target).await.expect("create");
        atomic.write(b"long").await.expect("write");
        atomic.finalize().await.expect("finalize");

        assert_eq!(std::fs::read(&target).expect("read"), b"long");
        assert_eq!(entries(temp.path()), vec![name]);
    }

    #[tokio::test]
    async fn cleanup_leaves_no_trace() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("a.txt");

        let mut atomic = AtomicFile::new(&target).await.expect("create");
        atomic.write(b"partial").await.expect("write");
        atomic.cleanup().await;

        assert!(entries(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn dropping_unfinished_file_removes_temp() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("a.txt");
        std::fs::write(&target, b"keep me").expect("write old");

        let mut atomic = AtomicFile::new(&target).await.expect("create");
        atomic.write(b"partial").await.expect("write");
        drop(atomic);

        assert_eq!(entries(temp.path()), vec!["a.txt".to_string()]);
        assert_eq!(std::fs::read(&target).expect("read"), b"keep me");
    }
}
