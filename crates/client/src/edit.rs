//! Per-comment inline edit state. The image disposition is a tagged variant
//! on purpose: "remove the image" and "never had one" must stay
//! distinguishable, because only the former triggers a blob delete on save.

use domain::{AttachmentRef, Comment, CommentId, PendingFile};

use crate::preview::PreviewHandle;

#[derive(Debug)]
pub enum ImageDisposition {
    /// Leave whatever the comment had untouched.
    Keep,
    /// Upload this file and point the comment at it.
    Replace(PendingFile),
    /// Drop the existing attachment reference and delete its blob.
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Editing,
    Saving,
}

/// At most one of these exists per client; created on "edit", destroyed on
/// save or cancel, never persisted anywhere.
pub struct EditSession {
    pub comment_id: CommentId,
    pub draft_text: String,
    pub image: ImageDisposition,
    pub phase: EditPhase,
    pub(crate) original_attachment: Option<AttachmentRef>,
    pub(crate) preview: Option<PreviewHandle>,
}

impl EditSession {
    /// Seeded from the comment as it currently reads, with the existing
    /// attachment marked "keep".
    pub fn begin(comment: &Comment) -> Self {
        Self {
            comment_id: comment.id.clone(),
            draft_text: comment.content.clone(),
            image: ImageDisposition::Keep,
            phase: EditPhase::Editing,
            original_attachment: comment.attachment.clone(),
            preview: None,
        }
    }

    /// Would saving right now end up with an attachment reference?
    pub fn resolves_to_attachment(&self) -> bool {
        match self.image {
            ImageDisposition::Keep => self.original_attachment.is_some(),
            ImageDisposition::Replace(_) => true,
            ImageDisposition::Remove => false,
        }
    }

    /// Empty text and no attachment is not a savable comment.
    pub fn would_be_empty(&self) -> bool {
        self.draft_text.trim().is_empty() && !self.resolves_to_attachment()
    }

    /// Picking a file always supersedes "keep" or "remove". Returns the
    /// preview handle being replaced, which the caller must revoke.
    pub(crate) fn pick_image(
        &mut self,
        file: PendingFile,
        handle: PreviewHandle,
    ) -> Option<PreviewHandle> {
        let previous = self.preview.replace(handle);
        self.image = ImageDisposition::Replace(file);
        previous
    }

    /// Explicitly clearing differs from never having picked: with an original
    /// attachment present it becomes "remove", otherwise it falls back to
    /// "keep" (which resolves to no reference without any blob delete).
    pub(crate) fn clear_image(&mut self) -> Option<PreviewHandle> {
        self.image = if self.original_attachment.is_some() {
            ImageDisposition::Remove
        } else {
            ImageDisposition::Keep
        };
        self.preview.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{PostId, UserId};

    fn comment(attachment: Option<AttachmentRef>) -> Comment {
        Comment {
            id: CommentId::new("c1"),
            post_id: PostId::new("p1"),
            author_id: UserId::new("u1"),
            content: "hello".into(),
            attachment,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        }
    }

    fn file() -> PendingFile {
        PendingFile::new("new.png", "image/png", vec![1])
    }

    fn handle() -> PreviewHandle {
        let mut previews = crate::preview::PreviewHandles::new();
        previews.create(&file())
    }

    #[test]
    fn begins_with_keep_and_current_text() {
        let session = EditSession::begin(&comment(Some(AttachmentRef::new("u", "p"))));
        assert!(matches!(session.image, ImageDisposition::Keep));
        assert_eq!(session.draft_text, "hello");
        assert!(session.resolves_to_attachment());
    }

    #[test]
    fn picking_supersedes_remove() {
        let mut session = EditSession::begin(&comment(Some(AttachmentRef::new("u", "p"))));
        session.clear_image();
        assert!(matches!(session.image, ImageDisposition::Remove));

        session.pick_image(file(), handle());
        assert!(matches!(session.image, ImageDisposition::Replace(_)));
    }

    #[test]
    fn clearing_without_original_is_keep_not_remove() {
        let mut session = EditSession::begin(&comment(None));
        session.pick_image(file(), handle());
        session.clear_image();
        assert!(matches!(session.image, ImageDisposition::Keep));
        assert!(!session.resolves_to_attachment());
    }

    #[test]
    fn empty_draft_with_kept_attachment_is_savable() {
        let mut session = EditSession::begin(&comment(Some(AttachmentRef::new("u", "p"))));
        session.draft_text = "   ".into();
        assert!(!session.would_be_empty());

        session.clear_image();
        assert!(session.would_be_empty());
    }
}
