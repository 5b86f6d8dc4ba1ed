//! Upload/delete client for comment and post images. Uploads validate first
//! and fail loudly; deletes are best-effort and never propagate.

use std::sync::Arc;

use domain::validate::{extension_for, validate_attachment};
use domain::{AttachmentRef, BlobStore, Error, PendingFile, Result, UserId};
use tracing::warn;

#[derive(Clone)]
pub struct Attachments {
    store: Arc<dyn BlobStore>,
}

impl Attachments {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Validates and stores the file, returning the reference to persist on
    /// the owning row. No partial success: an error here means nothing of
    /// this file is in the bucket.
    pub async fn upload(&self, file: &PendingFile, owner: &UserId) -> Result<AttachmentRef> {
        validate_attachment(file)?;
        let path = object_path(owner, &file.mime);
        self.store
            .put(&path, file.bytes.clone())
            .await
            .map_err(|e| Error::UploadFailed(e.to_string()))?;
        Ok(AttachmentRef::new(self.store.public_url(&path), path))
    }

    /// Best-effort delete. Resolves the object path directly, or from the
    /// public URL when a legacy row recorded nothing else. Failures are
    /// logged and absorbed.
    pub async fn delete(&self, reference: &AttachmentRef) {
        let path = match &reference.storage_path {
            Some(path) => path.clone(),
            None => match path_from_url(self.store.bucket(), &reference.url) {
                Some(path) => path,
                None => {
                    warn!(url = %reference.url, "no storage path recoverable, leaving blob behind");
                    return;
                }
            },
        };
        if let Err(e) = self.store.remove(std::slice::from_ref(&path)).await {
            warn!(%path, error = %e, "attachment delete failed, blob orphaned");
        }
    }
}

/// `{owner}/{millis}_{random}.{ext}` — collision-resistant enough within one
/// owner's namespace, and keyed by owner so cleanup tooling can scope scans.
fn object_path(owner: &UserId, mime: &str) -> String {
    format!(
        "{}/{}_{:08x}.{}",
        owner.as_str(),
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        extension_for(mime)
    )
}

/// Recover the object path from a public URL by splitting on the first
/// `/{bucket}/` segment, the way the URL was derived in the first place.
/// Fragile by construction if the bucket name shows up elsewhere in the URL;
/// the tests below pin the exact behavior.
pub(crate) fn path_from_url(bucket: &str, url: &str) -> Option<String> {
    let needle = format!("/{bucket}/");
    let idx = url.find(&needle)?;
    let path = &url[idx + needle.len()..];
    let path = path.split(['?', '#']).next()?;
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_path_after_bucket_segment() {
        assert_eq!(
            path_from_url(
                "attachments",
                "http://localhost:9000/attachments/u1/17000_ab.png"
            ),
            Some("u1/17000_ab.png".to_string())
        );
    }

    #[test]
    fn strips_query_and_fragment() {
        assert_eq!(
            path_from_url(
                "attachments",
                "http://h/attachments/u1/a.png?token=x#frag"
            ),
            Some("u1/a.png".to_string())
        );
    }

    #[test]
    fn no_bucket_segment_means_no_path() {
        assert_eq!(path_from_url("attachments", "http://h/other/u1/a.png"), None);
        assert_eq!(path_from_url("attachments", "http://h/attachments/"), None);
    }

    // The known edge case: an owner folder named like the bucket. The first
    // split is the correct one there; anything later in the URL is payload.
    #[test]
    fn bucket_named_folder_inside_path_is_kept() {
        assert_eq!(
            path_from_url(
                "attachments",
                "http://h/attachments/attachments/1.png"
            ),
            Some("attachments/1.png".to_string())
        );
    }

    #[test]
    fn object_path_is_scoped_to_owner_and_extension() {
        let path = object_path(&UserId::new("u9"), "image/webp");
        assert!(path.starts_with("u9/"));
        assert!(path.ends_with(".webp"));
    }
}
