//! ImageCache — asynchronous resolution of image references for cards.
//!
//! A reference is resolved once.  Local paths (plain or `file://`) are
//! stat'ed on a tokio task; `http(s)` references are only checked for shape
//! and described by host and file name, nothing is downloaded.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("empty image reference")]
    Empty,
    #[error("malformed image url: {0}")]
    MalformedUrl(String),
    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),
    #[error("no such file: {0}")]
    NotFound(String),
    #[error("not a regular file: {0}")]
    NotAFile(String),
    #[error("{0}")]
    Io(String),
}

/// What a card shows for a resolved image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// File name part of the reference.
    pub name: String,
    /// Where it lives: a host for remote images, a size for local files.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Loading,
    Ready(ImageInfo),
    Failed(ImageError),
}

/// Result of one background resolution, posted back into the UI loop.
#[derive(Debug, Clone)]
pub struct ImageResolved {
    pub reference: String,
    pub result: Result<ImageInfo, ImageError>,
}

pub struct ImageCache {
    entries: HashMap<String, ImageStatus>,
    tx: mpsc::Sender<ImageResolved>,
}

impl ImageCache {
    pub fn new(tx: mpsc::Sender<ImageResolved>) -> Self {
        Self {
            entries: HashMap::new(),
            tx,
        }
    }

    pub fn status(&self, reference: &str) -> Option<&ImageStatus> {
        self.entries.get(reference)
    }

    /// Start resolving `reference` unless it is already known.  Returns
    /// `true` if a new resolution was started.
    pub fn request(&mut self, reference: &str) -> bool {
        if self.entries.contains_key(reference) {
            return false;
        }
        self.entries
            .insert(reference.to_string(), ImageStatus::Loading);

        let tx = self.tx.clone();
        let reference = reference.to_string();
        tokio::spawn(async move {
            let result = resolve(&reference).await;
            if let Err(e) = &result {
                warn!("image: {}: {}", reference, e);
            }
            let _ = tx.send(ImageResolved { reference, result }).await;
        });
        true
    }

    pub fn on_resolved(&mut self, msg: ImageResolved) {
        let status = match msg.result {
            Ok(info) => ImageStatus::Ready(info),
            Err(e) => ImageStatus::Failed(e),
        };
        self.entries.insert(msg.reference, status);
    }

    pub fn is_loading(&self) -> bool {
        self.entries
            .values()
            .any(|s| matches!(s, ImageStatus::Loading))
    }
}

/// Resolve one reference.
pub async fn resolve(reference: &str) -> Result<ImageInfo, ImageError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ImageError::Empty);
    }

    if let Some(rest) = reference
        .strip_prefix("https://")
        .or_else(|| reference.strip_prefix("http://"))
    {
        return describe_remote(reference, rest);
    }

    if let Some(path) = reference.strip_prefix("file://") {
        return resolve_local(PathBuf::from(path)).await;
    }

    if reference.contains("://") {
        return Err(ImageError::UnsupportedScheme(reference.to_string()));
    }

    resolve_local(PathBuf::from(reference)).await
}

fn describe_remote(reference: &str, rest: &str) -> Result<ImageInfo, ImageError> {
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    if !host_ok {
        return Err(ImageError::MalformedUrl(reference.to_string()));
    }

    let path = path.split(['?', '#']).next().unwrap_or("");
    let name = path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(host)
        .to_string();

    Ok(ImageInfo {
        name,
        source: host.to_string(),
    })
}

async fn resolve_local(path: PathBuf) -> Result<ImageInfo, ImageError> {
    let shown = path.display().to_string();
    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImageError::NotFound(shown));
        }
        Err(e) => return Err(ImageError::Io(format!("{}: {}", shown, e))),
    };
    if !meta.is_file() {
        return Err(ImageError::NotAFile(shown));
    }
    debug!("image: local {} ({} bytes)", shown, meta.len());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(shown);
    Ok(ImageInfo {
        name,
        source: human_size(meta.len()),
    })
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remote_reference_is_described() {
        let info = resolve("https://img.reel.example/avatar/poster-1.jpg?w=300")
            .await
            .unwrap();
        assert_eq!(info.name, "poster-1.jpg");
        assert_eq!(info.source, "img.reel.example");

        let bare = resolve("http://img.reel.example").await.unwrap();
        assert_eq!(bare.name, "img.reel.example");
    }

    #[tokio::test]
    async fn test_bad_references_fail() {
        assert_eq!(resolve("  ").await, Err(ImageError::Empty));
        assert!(matches!(
            resolve("https:///nohost.jpg").await,
            Err(ImageError::MalformedUrl(_))
        ));
        assert!(matches!(
            resolve("ftp://host/x.jpg").await,
            Err(ImageError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let info = resolve(path.to_str().unwrap()).await.unwrap();
        assert_eq!(info.name, "still.png");
        assert_eq!(info.source, "2.0 KB");

        let via_scheme = resolve(&format!("file://{}", path.display())).await.unwrap();
        assert_eq!(via_scheme, info);

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            resolve(missing.to_str().unwrap()).await,
            Err(ImageError::NotFound(_))
        ));
        assert!(matches!(
            resolve(dir.path().to_str().unwrap()).await,
            Err(ImageError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_requests_once_and_records_result() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut cache = ImageCache::new(tx);
        let reference = "https://img.reel.example/a.jpg";

        assert!(cache.request(reference));
        assert!(!cache.request(reference));
        assert_eq!(cache.status(reference), Some(&ImageStatus::Loading));
        assert!(cache.is_loading());

        let msg = rx.recv().await.unwrap();
        cache.on_resolved(msg);
        assert!(matches!(
            cache.status(reference),
            Some(ImageStatus::Ready(info)) if info.name == "a.jpg"
        ));
        assert!(!cache.is_loading());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(12), "12 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }
}
