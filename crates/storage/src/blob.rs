// 对象落在 {root}/{bucket}/{path}，公开 URL 是 {base_url}/{bucket}/{path}

use async_trait::async_trait;
use domain::{BlobStore, Error, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub struct FsBlobStore {
    root: PathBuf,
    bucket: String,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_on_disk(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let sane = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !sane {
            return Err(Error::Store(format!("invalid object path: {path}")));
        }
        Ok(self.root.join(&self.bucket).join(rel))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let target = self.object_on_disk(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Store(e.to_string()))?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.object_on_disk(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound("blob", path.to_string()))
            }
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        // 逐个尝试，最后才报第一个错；单个失败不拦住其余的删除
        let mut first_err = None;
        for path in paths {
            let target = match self.object_on_disk(path) {
                Ok(t) => t,
                Err(e) => {
                    first_err.get_or_insert(e);
                    continue;
                }
            };
            match fs::remove_file(&target).await {
                Ok(()) => {}
                // Already gone counts as removed.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    first_err.get_or_insert(Error::Store(e.to_string()));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, path)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
