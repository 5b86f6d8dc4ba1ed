//! The imperative surface the UI drives: one `ThreadClient` per viewing
//! client, owning the synchronizer, the attachment client, the preview
//! handles and the (at most one) edit session.

use std::sync::Arc;

use domain::validate::validate_attachment;
use domain::{
    BlobStore, ChangeFeed, Comment, CommentId, CommentStore, Error, PendingFile, PostId,
    PostStore, Result, UserId,
};
use tokio::sync::watch;

use crate::attachments::Attachments;
use crate::cleanup;
use crate::edit::{EditPhase, EditSession, ImageDisposition};
use crate::preview::PreviewHandles;
use crate::sync::{ThreadSync, ThreadView};

fn no_session() -> Error {
    Error::NotFound("edit session", "none active".to_string())
}

pub struct ThreadClient {
    author: UserId,
    comments: Arc<dyn CommentStore>,
    posts: Arc<dyn PostStore>,
    attachments: Attachments,
    sync: ThreadSync,
    previews: PreviewHandles,
    edit: Option<EditSession>,
}

impl ThreadClient {
    pub fn new(
        author: UserId,
        comments: Arc<dyn CommentStore>,
        posts: Arc<dyn PostStore>,
        blobs: Arc<dyn BlobStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            author,
            sync: ThreadSync::new(comments.clone(), feed),
            comments,
            posts,
            attachments: Attachments::new(blobs),
            previews: PreviewHandles::new(),
            edit: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ThreadView> {
        self.sync.subscribe()
    }

    pub fn snapshot(&self) -> ThreadView {
        self.sync.snapshot()
    }

    /// Switch to another post's thread. Any in-progress edit is discarded
    /// with its preview handle; the previous subscription is torn down.
    pub fn view(&mut self, post_id: PostId) {
        self.cancel_edit();
        self.sync.view(post_id);
    }

    pub fn close(&mut self) {
        self.cancel_edit();
        self.sync.close();
    }

    pub fn refresh(&self) {
        self.sync.refresh();
    }

    /// Publish a comment on the currently viewed post. Empty text with an
    /// image is fine; empty text without one is rejected before any call.
    pub async fn post(&mut self, content: &str, file: Option<PendingFile>) -> Result<Comment> {
        if content.trim().is_empty() && file.is_none() {
            return Err(Error::EmptySubmission);
        }
        let post_id = self
            .sync
            .current_post()
            .ok_or_else(|| Error::NotFound("viewed post", "no thread open".to_string()))?;

        let attachment = match &file {
            Some(f) => match self.attachments.upload(f, &self.author).await {
                Ok(reference) => Some(reference),
                Err(e) => {
                    if !e.is_validation() {
                        self.sync.set_error(&e);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        match self
            .comments
            .create(&post_id, &self.author, content, attachment.clone())
            .await
        {
            Ok(created) => Ok(created),
            Err(e) => {
                // 行写入失败就把刚传的 blob 收回来，不留孤儿
                if let Some(fresh) = &attachment {
                    self.attachments.delete(fresh).await;
                }
                self.sync.set_error(&e);
                Err(e)
            }
        }
    }

    /// Delete one comment, then best-effort reclaim its blob. The row is the
    /// authoritative side; the blob never blocks it.
    pub async fn remove(&mut self, id: &CommentId) -> Result<CommentId> {
        let reference = self
            .sync
            .snapshot()
            .comments
            .iter()
            .find(|c| &c.id == id)
            .and_then(|c| c.attachment.clone());

        match self.comments.delete(id).await {
            Ok(deleted) => {
                if let Some(reference) = &reference {
                    self.attachments.delete(reference).await;
                }
                Ok(deleted)
            }
            Err(e) => {
                self.sync.set_error(&e);
                Err(e)
            }
        }
    }

    pub fn start_edit(&mut self, id: &CommentId) -> Result<()> {
        let comment = self
            .sync
            .snapshot()
            .comments
            .into_iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| Error::NotFound("comment", id.to_string()))?;
        self.cancel_edit();
        self.edit = Some(EditSession::begin(&comment));
        Ok(())
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        if let Some(session) = self.edit.as_mut() {
            session.draft_text = text.into();
        }
    }

    /// Select a replacement image for the edited comment. Creates the new
    /// preview and revokes the superseded one in the same transition.
    pub fn pick_image(&mut self, file: PendingFile) -> Result<()> {
        validate_attachment(&file)?;
        let session = self.edit.as_mut().ok_or_else(no_session)?;
        let handle = self.previews.create(&file);
        if let Some(old) = session.pick_image(file, handle) {
            self.previews.revoke(old);
        }
        Ok(())
    }

    /// Explicitly clear the image selection.
    pub fn clear_image(&mut self) -> Result<()> {
        let session = self.edit.as_mut().ok_or_else(no_session)?;
        if let Some(handle) = session.clear_image() {
            self.previews.revoke(handle);
        }
        Ok(())
    }

    /// Bytes of the currently previewed (not yet uploaded) image, if any.
    pub fn preview_bytes(&self) -> Option<Arc<[u8]>> {
        let handle = self.edit.as_ref()?.preview.as_ref()?;
        self.previews.resolve(handle)
    }

    /// Discard the draft. No network traffic: nothing was uploaded yet and
    /// the original blob is untouched.
    pub fn cancel_edit(&mut self) {
        if let Some(mut session) = self.edit.take() {
            if let Some(handle) = session.preview.take() {
                self.previews.revoke(handle);
            }
        }
    }

    pub async fn save_edit(&mut self) -> Result<Comment> {
        let session = self.edit.as_mut().ok_or_else(no_session)?;

        if session.would_be_empty() {
            // Caught before any network call; the session stays open.
            return Err(Error::EmptySubmission);
        }
        session.phase = EditPhase::Saving;

        let resolved = match &session.image {
            ImageDisposition::Keep => session.original_attachment.clone(),
            ImageDisposition::Remove => {
                if let Some(old) = &session.original_attachment {
                    self.attachments.delete(old).await;
                }
                None
            }
            ImageDisposition::Replace(file) => {
                if let Some(old) = &session.original_attachment {
                    self.attachments.delete(old).await;
                }
                match self.attachments.upload(file, &self.author).await {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        // Draft preserved so nothing has to be retyped.
                        session.phase = EditPhase::Editing;
                        self.sync.set_error(&e);
                        return Err(e);
                    }
                }
            }
        };

        match self
            .comments
            .update(&session.comment_id, &session.draft_text, resolved)
            .await
        {
            Ok(updated) => {
                // In-place swap keeps the list order stable.
                self.sync.replace_comment(&updated);
                if let Some(mut done) = self.edit.take() {
                    if let Some(handle) = done.preview.take() {
                        self.previews.revoke(handle);
                    }
                }
                Ok(updated)
            }
            Err(e) => {
                session.phase = EditPhase::Editing;
                self.sync.set_error(&e);
                Err(e)
            }
        }
    }

    /// Delete a post and everything hanging off it: blobs first, rows after.
    pub async fn delete_post(&mut self, id: &PostId) -> Result<()> {
        let result = cleanup::delete_post_cascading(
            &*self.posts,
            &*self.comments,
            &self.attachments,
            id,
        )
        .await;
        if let Err(e) = &result {
            self.sync.set_error(e);
        }
        result
    }
}
