use crate::storage::ObjectStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use mime::Mime;
use std::path::Path;

/// Bucket persisted in a sled database. Bodies and content types live in two
/// trees named after the bucket.
#[derive(Clone)]
pub struct SledStore {
    bucket: String,
    objects: sled::Tree,
    content_types: sled::Tree,
}

impl SledStore {
    pub fn open(path: &Path, bucket: &str) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("Failed to open sled database at {:?}", path))?;
        Self::with_db(&db, bucket)
    }

    /// Opens a bucket on an already opened database, so several buckets can
    /// share one file.
    pub fn with_db(db: &sled::Db, bucket: &str) -> Result<Self> {
        let objects = db.open_tree(bucket)?;
        let content_types = db.open_tree(format!("{}.content-type", bucket))?;
        Ok(Self {
            bucket: bucket.to_string(),
            objects,
            content_types,
        })
    }

    pub async fn flush(&self) -> Result<()> {
        self.objects.flush_async().await?;
        self.content_types.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SledStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &Mime) -> Result<()> {
        log::debug!("{}: put {} ({} bytes)", self.bucket, key, body.len());
        self.objects.insert(key.as_bytes(), body)?;
        self.content_types
            .insert(key.as_bytes(), content_type.as_ref().as_bytes())?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key.as_bytes())?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.objects
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|key| {
                let key = key?;
                String::from_utf8(key.to_vec())
                    .with_context(|| format!("Non UTF-8 key in bucket {}", self.bucket))
            })
            .collect()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key.as_bytes())?;
        self.content_types.remove(key.as_bytes())?;
        Ok(())
    }
}
