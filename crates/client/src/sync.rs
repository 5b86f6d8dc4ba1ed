//! Keeps the in-memory view of one comment thread consistent with the store.
//!
//! One listener task per viewed post; switching posts cancels it and resets
//! the view. Staleness is guarded by tags, not task liveness: the epoch drops
//! results from a previous post, the read ticket drops results overtaken by a
//! newer read of the same post.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use domain::{ChangeEvent, ChangeFeed, Comment, CommentStore, Error, PostId};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What the UI renders. `post_id` tags which post the rest of the fields are
/// valid for; a `None` tag is the idle state.
#[derive(Debug, Clone, Default)]
pub struct ThreadView {
    pub post_id: Option<PostId>,
    pub comments: Vec<Comment>,
    pub loading: bool,
    pub error: Option<String>,
}

struct ActiveThread {
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ThreadSync {
    comments: Arc<dyn CommentStore>,
    feed: Arc<dyn ChangeFeed>,
    tx: watch::Sender<ThreadView>,
    /// Bumped on every post switch; commits compare against it.
    epoch: Arc<AtomicU64>,
    /// Read ticket counter; only the newest issued read may commit.
    issued: Arc<AtomicU64>,
    active: Option<ActiveThread>,
}

impl ThreadSync {
    pub fn new(comments: Arc<dyn CommentStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        let (tx, _) = watch::channel(ThreadView::default());
        Self {
            comments,
            feed,
            tx,
            epoch: Arc::new(AtomicU64::new(0)),
            issued: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ThreadView> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ThreadView {
        self.tx.borrow().clone()
    }

    pub fn current_post(&self) -> Option<PostId> {
        self.tx.borrow().post_id.clone()
    }

    /// Switch the view to another post. Clears the list immediately so the
    /// previous thread never flashes under the new one, then starts the
    /// listener for the new post.
    pub fn view(&mut self, post_id: PostId) {
        self.stop_active();
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(ThreadView {
            post_id: Some(post_id.clone()),
            comments: Vec::new(),
            loading: true,
            error: None,
        });

        let token = CancellationToken::new();
        let task = tokio::spawn(run_thread(
            self.comments.clone(),
            self.feed.clone(),
            self.tx.clone(),
            self.epoch.clone(),
            my_epoch,
            self.issued.clone(),
            post_id,
            token.clone(),
        ));
        self.active = Some(ActiveThread { token, task });
    }

    /// Tear everything down: listener, subscription, view state.
    pub fn close(&mut self) {
        self.stop_active();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(ThreadView::default());
    }

    /// Explicit re-read of the current thread. Detached on purpose: the epoch
    /// guard drops it across a post switch, the read ticket drops it when a
    /// newer read of the same post was issued after it.
    pub fn refresh(&self) {
        let Some(post_id) = self.current_post() else {
            return;
        };
        let my_epoch = self.epoch.load(Ordering::SeqCst);
        let comments = self.comments.clone();
        let tx = self.tx.clone();
        let epoch = self.epoch.clone();
        let issued = self.issued.clone();
        tokio::spawn(async move {
            fetch_and_commit(&*comments, &tx, &epoch, my_epoch, &issued, &post_id).await;
        });
    }

    /// Swap one entry in place after a successful edit, preserving order.
    pub fn replace_comment(&self, updated: &Comment) {
        self.tx.send_if_modified(|view| {
            if view.post_id.as_ref() != Some(&updated.post_id) {
                return false;
            }
            match view.comments.iter_mut().find(|c| c.id == updated.id) {
                Some(slot) => {
                    *slot = updated.clone();
                    true
                }
                None => false,
            }
        });
    }

    /// Surface a failed thread-level operation. One message at a time: a new
    /// one replaces the previous. Cancellations are not user-facing.
    pub fn set_error(&self, error: &Error) {
        if error.is_cancellation() {
            return;
        }
        self.tx.send_modify(|view| view.error = Some(error.to_string()));
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            active.task.abort();
        }
    }
}

impl Drop for ThreadSync {
    fn drop(&mut self) {
        self.stop_active();
    }
}

async fn run_thread(
    comments: Arc<dyn CommentStore>,
    feed: Arc<dyn ChangeFeed>,
    tx: watch::Sender<ThreadView>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    issued: Arc<AtomicU64>,
    post_id: PostId,
    token: CancellationToken,
) {
    // 先订阅再首读，避免两者之间的变更丢失
    let mut rx = feed.subscribe();
    fetch_and_commit(&*comments, &tx, &epoch, my_epoch, &issued, &post_id).await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => match event {
                Ok(ChangeEvent::CommentsChanged { post_id: changed }) if changed == post_id => {
                    fetch_and_commit(&*comments, &tx, &epoch, my_epoch, &issued, &post_id).await;
                }
                Ok(ChangeEvent::PostDeleted { post_id: deleted }) if deleted == post_id => {
                    tx.send_if_modified(|view| {
                        if epoch.load(Ordering::SeqCst) != my_epoch {
                            return false;
                        }
                        // 作废所有在途读取，删除后的清空不许被回填
                        issued.fetch_add(1, Ordering::SeqCst);
                        view.comments.clear();
                        view.loading = false;
                        view.error = None;
                        true
                    });
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, post = %post_id, "change feed lagged, re-reading thread");
                    fetch_and_commit(&*comments, &tx, &epoch, my_epoch, &issued, &post_id).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

async fn fetch_and_commit(
    comments: &dyn CommentStore,
    tx: &watch::Sender<ThreadView>,
    epoch: &AtomicU64,
    my_epoch: u64,
    issued: &AtomicU64,
    post_id: &PostId,
) {
    // 领号和置 loading 在同一把锁里完成，过期纪元拿不到号
    let mut my_req = 0;
    let claimed = tx.send_if_modified(|view| {
        if epoch.load(Ordering::SeqCst) != my_epoch {
            return false;
        }
        my_req = issued.fetch_add(1, Ordering::SeqCst) + 1;
        view.loading = true;
        true
    });
    if !claimed {
        return;
    }
    match comments.list(post_id).await {
        Ok(list) => {
            commit(tx, epoch, my_epoch, issued, my_req, |view| {
                view.comments = list;
                view.loading = false;
                view.error = None;
            });
        }
        Err(e) if e.is_cancellation() => {
            debug!(post = %post_id, "superseded read dropped");
        }
        Err(e) => {
            // Keep the last good list visible; only the error banner changes.
            commit(tx, epoch, my_epoch, issued, my_req, |view| {
                view.loading = false;
                view.error = Some(e.to_string());
            });
        }
    }
}

/// The single commit gate for read results. Both comparisons run inside the
/// watch lock: a stale epoch means the view switched posts, a stale ticket
/// means a newer read of the same post was issued after this one.
fn commit(
    tx: &watch::Sender<ThreadView>,
    epoch: &AtomicU64,
    my_epoch: u64,
    issued: &AtomicU64,
    my_req: u64,
    apply: impl FnOnce(&mut ThreadView),
) -> bool {
    tx.send_if_modified(|view| {
        if epoch.load(Ordering::SeqCst) != my_epoch || issued.load(Ordering::SeqCst) != my_req {
            return false;
        }
        apply(view);
        true
    })
}
