use async_trait::async_trait;
use domain::{AttachmentRef, ChangeEvent, Error, Post, PostId, PostStore, Result, UserId};
use uuid::Uuid;

use crate::{models::SqlPost, store_err, Db};

#[async_trait]
impl PostStore for Db {
    async fn create(
        &self,
        owner_id: &UserId,
        title: &str,
        body: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Post> {
        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO posts \
             (id, owner_id, title, body, attachment_url, attachment_path, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner_id.as_str())
        .bind(title)
        .bind(body)
        .bind(attachment.as_ref().map(|a| a.url.clone()))
        .bind(attachment.as_ref().and_then(|a| a.storage_path.clone()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(Post {
            id: PostId::new(id),
            owner_id: owner_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            attachment,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: &PostId) -> Result<Post> {
        let row = sqlx::query_as::<_, SqlPost>(
            "SELECT id, owner_id, title, body, attachment_url, attachment_path, \
             created_at, updated_at FROM posts WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Into::into)
            .ok_or_else(|| Error::NotFound("post", id.to_string()))
    }

    async fn delete(&self, id: &PostId) -> Result<()> {
        let done = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound("post", id.to_string()));
        }

        // 评论行由外键级联处理，这里只需要广播一次
        self.notify(ChangeEvent::PostDeleted {
            post_id: id.clone(),
        });
        Ok(())
    }
}
