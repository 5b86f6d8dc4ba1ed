use crate::error::{Error, Result};
use crate::models::PendingFile;

pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Pure pre-flight check; every upload path must pass through here before
/// touching the blob store.
pub fn validate_attachment(file: &PendingFile) -> Result<()> {
    if !ALLOWED_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err(Error::InvalidType(file.mime.clone()));
    }
    if file.size() > MAX_ATTACHMENT_BYTES {
        return Err(Error::TooLarge { size: file.size() });
    }
    Ok(())
}

/// File extension used when deriving an object path for an upload.
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
