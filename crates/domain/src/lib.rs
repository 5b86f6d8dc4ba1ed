mod error;
mod events;
mod models;
pub mod traits;
pub mod validate;

pub use error::{Error, Result};
pub use events::ChangeEvent;
pub use models::{AttachmentRef, Comment, CommentId, PendingFile, Post, PostId, UserId};
pub use traits::{BlobStore, ChangeFeed, CommentStore, PostStore};
