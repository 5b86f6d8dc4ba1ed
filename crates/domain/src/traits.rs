//! Contracts for the remote collaborators: the core never talks to a
//! concrete backend, it sees a row store, a blob store and a change feed
//! through these traits.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::ChangeEvent;
use crate::models::{AttachmentRef, Comment, CommentId, Post, PostId, UserId};

/// Row CRUD for the comments of one parent post.
///
/// No retry policy here; callers that want retries layer them on top.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// All comments of a post, ascending by creation time.
    async fn list(&self, post_id: &PostId) -> Result<Vec<Comment>>;

    async fn create(
        &self,
        post_id: &PostId,
        author_id: &UserId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment>;

    /// Rewrites content and attachment reference, stamping `updated_at`.
    async fn update(
        &self,
        id: &CommentId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment>;

    async fn delete(&self, id: &CommentId) -> Result<CommentId>;
}

/// Row CRUD for posts. Deleting a post cascades over its comment rows at the
/// store level; blob reclamation is the caller's job.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(
        &self,
        owner_id: &UserId,
        title: &str,
        body: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Post>;

    async fn get(&self, id: &PostId) -> Result<Post>;

    async fn delete(&self, id: &PostId) -> Result<()>;
}

/// Binary object storage with deterministic public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Removing a path that no longer exists is not an error.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    fn public_url(&self, path: &str) -> String;

    fn bucket(&self) -> &str;
}

/// Server-initiated "something changed" signals. Events carry no row data;
/// consumers react by re-reading through the stores.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
