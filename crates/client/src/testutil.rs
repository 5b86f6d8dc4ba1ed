//! In-memory collaborators for exercising the core without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    AttachmentRef, BlobStore, ChangeEvent, ChangeFeed, Comment, CommentId, CommentStore, Error,
    Post, PostId, PostStore, Result, UserId,
};
use tokio::sync::broadcast;

/// Row store + change feed in one, with knobs for delays and failures.
pub struct FakeStore {
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
    list_delay: Mutex<HashMap<PostId, Duration>>,
    fail_next_list: AtomicBool,
    fail_next_update: AtomicBool,
    seq: AtomicI64,
    tx: broadcast::Sender<ChangeEvent>,
}

impl FakeStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            posts: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            list_delay: Mutex::new(HashMap::new()),
            fail_next_list: AtomicBool::new(false),
            fail_next_update: AtomicBool::new(false),
            seq: AtomicI64::new(1),
            tx,
        }
    }

    fn tick(&self) -> chrono::NaiveDateTime {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        chrono::DateTime::from_timestamp(seq, 0)
            .expect("valid timestamp")
            .naive_utc()
    }

    pub fn seed_post(&self, tag: &str, attachment: Option<AttachmentRef>) -> Post {
        let now = self.tick();
        let post = Post {
            id: PostId::new(format!("post-{tag}")),
            owner_id: UserId::new("owner"),
            title: tag.to_string(),
            body: String::new(),
            attachment,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        post
    }

    pub fn set_list_delay(&self, post_id: &PostId, delay: Duration) {
        self.list_delay
            .lock()
            .unwrap()
            .insert(post_id.clone(), delay);
    }

    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    pub fn comment_count(&self, post_id: &PostId) -> usize {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.post_id == post_id)
            .count()
    }

    fn notify(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl CommentStore for FakeStore {
    async fn list(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(Error::Store("injected list failure".into()));
        }
        let mut rows: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.post_id == post_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_str().cmp(b.id.as_str())));
        // 先取快照再延迟，模拟响应在路上耽搁
        let delay = self.list_delay.lock().unwrap().get(post_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn create(
        &self,
        post_id: &PostId,
        author_id: &UserId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment> {
        let created_at = self.tick();
        let comment = Comment {
            id: CommentId::new(format!("comment-{:06}", self.seq.load(Ordering::SeqCst))),
            post_id: post_id.clone(),
            author_id: author_id.clone(),
            content: content.to_string(),
            attachment,
            created_at,
            updated_at: None,
        };
        self.comments.lock().unwrap().push(comment.clone());
        self.notify(ChangeEvent::CommentsChanged {
            post_id: post_id.clone(),
        });
        Ok(comment)
    }

    async fn update(
        &self,
        id: &CommentId,
        content: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Comment> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(Error::Store("injected update failure".into()));
        }
        let updated_at = self.tick();
        let mut rows = self.comments.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|c| &c.id == id) else {
            return Err(Error::NotFound("comment", id.to_string()));
        };
        row.content = content.to_string();
        row.attachment = attachment;
        row.updated_at = Some(updated_at);
        let updated = row.clone();
        drop(rows);
        self.notify(ChangeEvent::CommentsChanged {
            post_id: updated.post_id.clone(),
        });
        Ok(updated)
    }

    async fn delete(&self, id: &CommentId) -> Result<CommentId> {
        let mut rows = self.comments.lock().unwrap();
        let Some(pos) = rows.iter().position(|c| &c.id == id) else {
            return Err(Error::NotFound("comment", id.to_string()));
        };
        let removed = rows.remove(pos);
        drop(rows);
        self.notify(ChangeEvent::CommentsChanged {
            post_id: removed.post_id,
        });
        Ok(id.clone())
    }
}

#[async_trait]
impl PostStore for FakeStore {
    async fn create(
        &self,
        owner_id: &UserId,
        title: &str,
        body: &str,
        attachment: Option<AttachmentRef>,
    ) -> Result<Post> {
        let now = self.tick();
        let post = Post {
            id: PostId::new(format!("post-{:06}", self.seq.load(Ordering::SeqCst))),
            owner_id: owner_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            attachment,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn get(&self, id: &PostId) -> Result<Post> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("post", id.to_string()))
    }

    async fn delete(&self, id: &PostId) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        let Some(pos) = posts.iter().position(|p| &p.id == id) else {
            return Err(Error::NotFound("post", id.to_string()));
        };
        posts.remove(pos);
        drop(posts);
        // Referential cascade, fake edition.
        self.comments.lock().unwrap().retain(|c| &c.post_id != id);
        self.notify(ChangeEvent::PostDeleted {
            post_id: id.clone(),
        });
        Ok(())
    }
}

impl ChangeFeed for FakeStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

/// In-memory bucket with call counters and an optional flaky path whose
/// delete reports a transport error after the object is already gone (the
/// "response lost" flavor of failure).
pub struct FakeBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    removes: AtomicUsize,
    flaky_path: Mutex<Option<String>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            flaky_path: Mutex::new(None),
        }
    }

    pub fn fail_delete_of(&self, path: &str) {
        *self.flaky_path.lock().unwrap() = Some(path.to_string());
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound("blob", path.to_string()))
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        let mut failed = false;
        for path in paths {
            self.objects.lock().unwrap().remove(path);
            let mut flaky = self.flaky_path.lock().unwrap();
            if flaky.as_deref() == Some(path.as_str()) {
                flaky.take();
                failed = true;
            }
        }
        if failed {
            return Err(Error::Store("simulated transport failure".into()));
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://blobs.test/attachments/{path}")
    }

    fn bucket(&self) -> &str {
        "attachments"
    }
}
