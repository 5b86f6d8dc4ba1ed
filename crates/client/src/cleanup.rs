//! Cascading blob reclamation for post deletion.

use domain::{CommentStore, PostId, PostStore, Result};
use tracing::info;

use crate::attachments::Attachments;

/// Deletes a post along with every blob it and its comments reference.
///
/// Reference enumeration strictly precedes the row delete: once the rows are
/// gone the paths are unrecoverable and the blobs would be orphaned forever.
/// Individual blob deletes are best-effort and never stop the cascade.
pub async fn delete_post_cascading(
    posts: &dyn PostStore,
    comments: &dyn CommentStore,
    attachments: &Attachments,
    post_id: &PostId,
) -> Result<()> {
    let post = posts.get(post_id).await?;
    let thread = comments.list(post_id).await?;

    let mut references = Vec::new();
    if let Some(reference) = post.attachment {
        references.push(reference);
    }
    references.extend(thread.into_iter().filter_map(|c| c.attachment));

    info!(post = %post_id, blobs = references.len(), "reclaiming attachments before row delete");
    for reference in &references {
        attachments.delete(reference).await;
    }

    // The store's cascade takes the comment rows down with the post.
    posts.delete(post_id).await
}
