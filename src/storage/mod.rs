use anyhow::Result;
use async_trait::async_trait;
use mime::Mime;

/// Flat key/value object storage, addressed by `/`-separated keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes (or overwrites) an object.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &Mime) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Keys starting with `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

pub mod disk;
pub mod memory;

pub use self::disk::SledStore;
pub use self::memory::MemoryStore;
