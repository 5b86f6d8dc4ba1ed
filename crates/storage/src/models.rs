use chrono::NaiveDateTime;
use domain::{AttachmentRef, Comment, CommentId, Post, PostId, UserId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

// 旧数据可能只存了 URL；attachment_path 为空时照样要能构造引用
fn attachment_from_columns(
    url: Option<String>,
    path: Option<String>,
) -> Option<AttachmentRef> {
    url.map(|url| AttachmentRef {
        url,
        storage_path: path,
    })
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: CommentId::new(sql.id),
            post_id: PostId::new(sql.post_id),
            author_id: UserId::new(sql.author_id),
            content: sql.content,
            attachment: attachment_from_columns(sql.attachment_url, sql.attachment_path),
            created_at: sql.created_at,
            updated_at: sql.updated_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlPost {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub attachment_url: Option<String>,
    pub attachment_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SqlPost> for Post {
    fn from(sql: SqlPost) -> Self {
        Post {
            id: PostId::new(sql.id),
            owner_id: UserId::new(sql.owner_id),
            title: sql.title,
            body: sql.body,
            attachment: attachment_from_columns(sql.attachment_url, sql.attachment_path),
            created_at: sql.created_at,
            updated_at: sql.updated_at,
        }
    }
}
