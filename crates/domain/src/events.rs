use crate::models::PostId;
use serde::{Deserialize, Serialize};

/// 变更通知只说"哪里变了"，不携带数据；消费方总是整体回读列表。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// The comment set of a post changed (create, update or delete).
    CommentsChanged { post_id: PostId },
    /// The post itself is gone; its thread view should empty out.
    PostDeleted { post_id: PostId },
}
