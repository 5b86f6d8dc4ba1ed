use domain::{ChangeEvent, ChangeFeed};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::{fs, path::Path};
use tokio::sync::broadcast;
use tracing::{debug, info};

mod blob;
mod models;
mod repo;

pub use blob::FsBlobStore;

/// 广播通道容量；消费端落后太多时会收到 Lagged 并整体回读
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
    tx_events: broadcast::Sender<ChangeEvent>,
}

impl Db {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        if db_url.starts_with("sqlite://") && !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://");
            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }
        // 内存库每个连接各自独立，必须收敛到单连接
        let options = if db_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = options.connect(db_url).await?;
        sqlx::query("PRAGMA journal_mode = WAL;")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL;")
            .execute(&pool)
            .await?;
        // 级联删除依赖外键约束，SQLite 默认是关闭的
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!(db = db_url, "migrations applied");

        let (tx_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { pool, tx_events })
    }

    pub(crate) fn notify(&self, event: ChangeEvent) {
        if self.tx_events.send(event).is_err() {
            // 没有订阅者时发送必然失败，不算错误
            debug!("change event dropped, no subscribers");
        }
    }
}

impl ChangeFeed for Db {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx_events.subscribe()
    }
}

pub(crate) fn store_err(e: sqlx::Error) -> domain::Error {
    domain::Error::Store(e.to_string())
}
