//! The media boundary: bytes go in, a URL and a kind come out.
//!
//! The feed never holds media bytes, only the [`MediaRef`] returned here.

use std::io;
use std::path::PathBuf;

use crate::feed::{FeedError, MediaKind, MediaRef};

pub const MEDIA_URL_PREFIX: &str = "/media";

pub trait MediaStore: Send + Sync {
    /// Persist a blob and return where it can be fetched from.
    fn store(&self, bytes: &[u8], kind: MediaKind, extension: &str) -> io::Result<MediaRef>;

    /// Read a stored blob back by its file name.
    fn open(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Decide whether an upload is an image or a video, preferring the declared
/// content type and falling back to the file name.
pub fn classify(content_type: Option<&str>, file_name: Option<&str>) -> Result<MediaKind, FeedError> {
    let declared = content_type.filter(|ct| !ct.trim().is_empty() && *ct != "application/octet-stream");
    let guessed = file_name.and_then(|name| mime_guess::from_path(name).first());

    declared
        .and_then(MediaKind::from_content_type)
        .or_else(|| guessed.and_then(|mime| MediaKind::from_content_type(mime.essence_str())))
        .ok_or_else(|| FeedError::Validation("Only image and video uploads are supported".into()))
}

/// File extension to store a blob under.
pub fn extension_for(content_type: Option<&str>, file_name: Option<&str>, kind: MediaKind) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name
        .or_else(|| {
            content_type
                .and_then(|ct| ct.split('/').nth(1))
                .map(|sub| sub.split(';').next().unwrap_or(sub).trim().to_ascii_lowercase())
                .filter(|sub| sub.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| match kind {
            MediaKind::Image => "img".to_string(),
            MediaKind::Video => "vid".to_string(),
        })
}

/// Stored names are `<uuid>.<ext>`; anything else (paths, dot-dot) is refused.
pub fn is_safe_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((stem, ext)) => {
            uuid::Uuid::parse_str(stem).is_ok()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Blobs as files in one directory.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl MediaStore for LocalMediaStore {
    fn store(&self, bytes: &[u8], kind: MediaKind, extension: &str) -> io::Result<MediaRef> {
        let name = format!("{}.{}", uuid::Uuid::now_v7(), extension);
        std::fs::write(self.root.join(&name), bytes)?;
        tracing::debug!(name = %name, size = bytes.len(), kind = kind.as_str(), "media stored");
        Ok(MediaRef {
            url: format!("{}/{}", MEDIA_URL_PREFIX, name),
            kind,
        })
    }

    fn open(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        if !is_safe_name(name) {
            return Ok(None);
        }
        match std::fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_wins() {
        assert_eq!(
            classify(Some("video/mp4"), Some("clip.png")).unwrap(),
            MediaKind::Video
        );
    }

    #[test]
    fn falls_back_to_file_name() {
        assert_eq!(classify(None, Some("photo.jpg")).unwrap(), MediaKind::Image);
        assert_eq!(
            classify(Some("application/octet-stream"), Some("clip.mp4")).unwrap(),
            MediaKind::Video
        );
    }

    #[test]
    fn rejects_non_media() {
        assert!(classify(Some("application/pdf"), Some("notes.pdf")).is_err());
        assert!(classify(None, None).is_err());
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(extension_for(Some("image/png"), Some("a.JPG"), MediaKind::Image), "jpg");
        assert_eq!(extension_for(Some("image/png"), None, MediaKind::Image), "png");
        assert_eq!(extension_for(None, Some("noext"), MediaKind::Video), "vid");
    }

    #[test]
    fn safe_names_only() {
        let name = format!("{}.png", uuid::Uuid::now_v7());
        assert!(is_safe_name(&name));
        assert!(!is_safe_name("../etc/passwd"));
        assert!(!is_safe_name("photo.png"));
        assert!(!is_safe_name(&format!("{}", uuid::Uuid::now_v7())));
    }

    #[test]
    fn store_then_open() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(tmp.path().join("uploads")).unwrap();
        let media = store.store(b"not really a png", MediaKind::Image, "png").unwrap();
        assert_eq!(media.kind, MediaKind::Image);
        let name = media.url.strip_prefix("/media/").unwrap();
        assert_eq!(store.open(name).unwrap().unwrap(), b"not really a png");
        assert!(store
            .open(&format!("{}.png", uuid::Uuid::now_v7()))
            .unwrap()
            .is_none());
    }
}
