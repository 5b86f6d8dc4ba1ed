// 把线程核心接上 sqlite + 文件系统存储，完整走一遍评论生命周期

mod config;

use std::sync::Arc;

use anyhow::Context;
use client::ThreadClient;
use domain::{BlobStore, PendingFile, PostStore, UserId};
use dotenvy::dotenv;
use storage::{Db, FsBlobStore};
use tracing::info;

use config::Settings;

// Smallest valid-enough PNG payload for a demo upload.
const DEMO_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let db = Arc::new(Db::new(&settings.database.url).await?);
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
        settings.blobs.root.clone(),
        settings.blobs.bucket.clone(),
        &settings.blobs.public_base_url,
    ));
    let author = UserId::new(settings.user.id.clone());

    let post = PostStore::create(&*db, &author, "Hello from talkback", "First post.", None)
        .await
        .context("Failed to create demo post")?;
    info!(post = %post.id, "demo post created");

    let mut client = ThreadClient::new(
        author,
        db.clone(),
        db.clone(),
        blobs,
        db.clone(),
    );
    let mut view_rx = client.subscribe();

    println!("[1/4] Opening thread for post {}...", post.id);
    client.view(post.id.clone());
    view_rx.changed().await.ok();

    println!("[2/4] Posting a comment with an image...");
    let comment = client
        .post(
            "A comment with a picture attached.",
            Some(PendingFile::new("hello.png", "image/png", DEMO_PNG.to_vec())),
        )
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let view = client.snapshot();
    println!("   -> Thread now holds {} comment(s):", view.comments.len());
    for c in &view.comments {
        let marker = if c.attachment.is_some() { " [img]" } else { "" };
        println!("      - [{}] {}{}", c.created_at, c.content, marker);
    }

    println!("[3/4] Editing the comment, removing its image...");
    client.start_edit(&comment.id)?;
    client.set_draft_text("Edited: the picture is gone now.");
    client.clear_image()?;
    let updated = client.save_edit().await?;
    println!(
        "   -> Saved. edited={} attachment={:?}",
        updated.is_edited(),
        updated.attachment
    );

    println!("[4/4] Deleting the post (cascading cleanup)...");
    client.delete_post(&post.id).await?;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    println!(
        "   -> Done. Thread view is empty: {}",
        client.snapshot().comments.is_empty()
    );

    client.close();
    Ok(())
}
