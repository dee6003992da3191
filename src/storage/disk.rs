use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{AttachmentError, AttachmentStore, UPLOADS_PREFIX};

/// Attachments on the local filesystem under a single root directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map `/uploads/<subdir>/<file>` onto the root, refusing anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, AttachmentError> {
        let relative = path
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AttachmentError::InvalidPath(path.to_string()))?;

        let relative = Path::new(relative);
        let safe = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return Err(AttachmentError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep ASCII letters, digits, dot, dash and underscore; never start with a dot.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl AttachmentStore for DiskStore {
    async fn put(&self, subdir: &str, original_name: &str, body: Bytes) -> Result<String, AttachmentError> {
        if subdir.is_empty() || !subdir.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AttachmentError::InvalidPath(subdir.to_string()));
        }

        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let unique = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            &unique[..8],
            sanitize_file_name(original_name)
        );
        tokio::fs::write(dir.join(&file_name), &body).await?;

        debug!(subdir, file = %file_name, bytes = body.len(), "stored attachment");
        Ok(format!("{}/{}/{}", UPLOADS_PREFIX, subdir, file_name))
    }

    async fn delete(&self, path: &str) -> Result<bool, AttachmentError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path, "removed attachment");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
