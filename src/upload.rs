//! 多文件上传处理器：派生安全的目标文件名并逐个写入保存目录。

use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::atomic::AtomicFile;
use crate::auth::Identity;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::storage::{Storage, StorageError};

/// Multipart field names that carry files.
pub const FILE_FIELDS: [&str; 2] = ["files", "files[]"];

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub names: Vec<String>,
}

#[derive(Debug)]
pub struct StoredFile {
    pub original: String,
    pub content_type: String,
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// 接收 `multipart/form-data` 上传，返回按提交顺序排列的存储文件名。
///
/// 任一文件失败即中止整个请求；同一请求中先前写入的文件保留在磁盘上。
pub async fn upload_files(
    Extension(config): Extension<Arc<ServerConfig>>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, JsonResponse<UploadResponse>), ApiError> {
    let mut multipart = multipart?;
    let storage = Storage::new(config.save_dir.clone());
    let mut names = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default();
        if !FILE_FIELDS.iter().any(|name| *name == field_name) {
            debug!(field = field_name, "skipping non-file multipart field");
            continue;
        }

        match store_field(&storage, identity.as_str(), field).await {
            Ok(stored) => {
                info!(
                    original = stored.original,
                    content_type = stored.content_type,
                    destination = %stored.path.display(),
                    bytes = stored.bytes,
                    "wrote file"
                );
                names.push(stored.name);
            }
            Err(err) => {
                warn!(stored = names.len(), error = ?err, "upload aborted");
                return Err(err);
            }
        }
    }

    if names.is_empty() {
        return Err(ApiError::BadRequest("no files provided".into()));
    }

    Ok((StatusCode::CREATED, JsonResponse(UploadResponse { names })))
}

/// 将单个文件字段流式写入派生出的目标路径。
async fn store_field(
    storage: &Storage,
    identity: &str,
    mut field: Field<'_>,
) -> Result<StoredFile, ApiError> {
    let original = field
        .file_name()
        .map(str::to_owned)
        .ok_or_else(|| ApiError::BadRequest("file part has no filename".into()))?;
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();

    let target = storage.destination_for(&original, identity).await?;
    let mut atomic = AtomicFile::new(&target).await?;
    let write_result: Result<(), ApiError> = async {
        while let Some(chunk) = field.chunk().await? {
            if !chunk.is_empty() {
                atomic.write(&chunk).await?;
            }
        }
        Ok(())
    }
    .await;
    if let Err(err) = write_result {
        atomic.cleanup().await;
        return Err(err);
    }
    let bytes = atomic.finalize().await?;

    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| StorageError::InvalidName(original.clone()))?;
    Ok(StoredFile {
        original,
        content_type,
        name,
        path: target,
        bytes,
    })
}
