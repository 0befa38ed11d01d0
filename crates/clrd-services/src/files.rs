//! Retrieval and deletion of stored files by identifier.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use clrd_storage::{LocalStorage, StorageError, StorageResult};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Bytes inspected to guess a content type
pub const SNIFF_LEN: u64 = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a MIME type from the leading bytes of a file.
///
/// Signature detection first; otherwise UTF-8 text (a code point cut at the
/// end of the window still counts) or a generic binary type.
pub fn sniff_content_type(head: &[u8]) -> String {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }

    match std::str::from_utf8(head) {
        Ok(_) => TEXT_PLAIN.to_string(),
        Err(e) if e.error_len().is_none() => TEXT_PLAIN.to_string(),
        Err(_) => OCTET_STREAM.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn from_download_flag(download: bool) -> Self {
        if download {
            Disposition::Attachment
        } else {
            Disposition::Inline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }

    /// `Content-Disposition` value naming `file_name`
    pub fn header_value(&self, file_name: &str) -> String {
        let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{}; filename=\"{}\"", self.as_str(), escaped)
    }
}

/// An open stored file, rewound to offset 0
#[derive(Debug)]
pub struct RetrievedFile {
    pub path: PathBuf,
    pub file: File,
    /// Stored base name (`{identifier}{ext}`)
    pub file_name: String,
    pub content_type: String,
    pub disposition: Disposition,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

#[derive(Clone)]
pub struct FileService {
    storage: Arc<LocalStorage>,
}

impl FileService {
    pub fn new(storage: Arc<LocalStorage>) -> Self {
        Self { storage }
    }

    async fn resolve_or_not_found(&self, id: &str) -> StorageResult<PathBuf> {
        self.storage.resolve(id).await?.ok_or_else(|| {
            tracing::debug!(file_id = %id, "File not found");
            StorageError::NotFound(id.to_string())
        })
    }

    pub async fn retrieve(&self, id: &str, disposition: Disposition) -> StorageResult<RetrievedFile> {
        let start = Instant::now();
        let path = self.resolve_or_not_found(id).await?;

        // The file may vanish between resolution and open; report it as missing.
        let mut file = File::open(&path).await.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Failed to open resolved file");
            StorageError::NotFound(id.to_string())
        })?;

        let metadata = file.metadata().await?;

        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        (&mut file).take(SNIFF_LEN).read_to_end(&mut head).await?;
        file.seek(SeekFrom::Start(0)).await?;

        let content_type = sniff_content_type(&head);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());

        tracing::info!(
            file_id = %id,
            path = %path.display(),
            content_type = %content_type,
            disposition = disposition.as_str(),
            size_bytes = metadata.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File retrieved"
        );

        Ok(RetrievedFile {
            path,
            file,
            file_name,
            content_type,
            disposition,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    /// Remove the file for `id`, returning the path that was deleted.
    pub async fn delete(&self, id: &str) -> StorageResult<PathBuf> {
        let path = self.resolve_or_not_found(id).await?;
        self.storage.remove(&path).await?;

        tracing::info!(file_id = %id, path = %path.display(), "File deleted");
        Ok(path)
    }
}
