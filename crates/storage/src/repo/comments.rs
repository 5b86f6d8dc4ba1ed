use async_trait::async_trait;
use domain::{
    AttachmentRef, ChangeEvent, Comment, CommentId, CommentStore, Error, PostId, Result, UserId,
};
use uuid::Uuid;

use crate::{models::SqlComment, store_err, Db};

const SELECT_COMMENT: &str = "SELECT id, post_id, author_id, content, \
     attachment_url, attachment_path, created_at, updated_at FROM comments";

#[async_trait]
impl CommentStore for Db {
    async fn list(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "{SELECT_COMMENT} WHERE post_id = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(
        &self,
        post_id: &PostId,
        author_id: &UserId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment> {
        // v7 保证 ID 按时间有序，同毫秒的排序靠它兜底
        let id = Uuid::now_v7().to_string();
        let created_at = chrono::Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO comments \
             (id, post_id, author_id, content, attachment_url, attachment_path, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(post_id.as_str())
        .bind(author_id.as_str())
        .bind(content)
        .bind(attachment.as_ref().map(|a| a.url.clone()))
        .bind(attachment.as_ref().and_then(|a| a.storage_path.clone()))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        self.notify(ChangeEvent::CommentsChanged {
            post_id: post_id.clone(),
        });

        Ok(Comment {
            id: CommentId::new(id),
            post_id: post_id.clone(),
            author_id: author_id.clone(),
            content: content.to_string(),
            attachment,
            created_at,
            updated_at: None,
        })
    }

    async fn update(
        &self,
        id: &CommentId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment> {
        let updated_at = chrono::Utc::now().naive_utc();

        let done = sqlx::query(
            "UPDATE comments SET content = ?, attachment_url = ?, attachment_path = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(attachment.as_ref().map(|a| a.url.clone()))
        .bind(attachment.as_ref().and_then(|a| a.storage_path.clone()))
        .bind(updated_at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound("comment", id.to_string()));
        }

        let row = sqlx::query_as::<_, SqlComment>(&format!("{SELECT_COMMENT} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let comment: Comment = row.into();
        self.notify(ChangeEvent::CommentsChanged {
            post_id: comment.post_id.clone(),
        });
        Ok(comment)
    }

    async fn delete(&self, id: &CommentId) -> Result<CommentId> {
        // 先拿 post_id，删完行就查不到了
        let post_id: Option<(String,)> =
            sqlx::query_as("SELECT post_id FROM comments WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        let Some((post_id,)) = post_id else {
            return Err(Error::NotFound("comment", id.to_string()));
        };

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        self.notify(ChangeEvent::CommentsChanged {
            post_id: PostId::new(post_id),
        });
        Ok(id.clone())
    }
}
