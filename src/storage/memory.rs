use crate::storage::ObjectStore;
use anyhow::Result;
use async_trait::async_trait;
use mime::Mime;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// Process-local store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.content_type.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &Mime) -> Result<()> {
        log::debug!("memory put {} ({} bytes)", key, body.len());
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|object| object.body.clone()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let store = MemoryStore::new();
        store
            .put("E1/BS/a.json", b"{}".to_vec(), &mime::APPLICATION_JSON)
            .await
            .unwrap();
        store
            .put("E1/BS/b.html", b"<p/>".to_vec(), &mime::TEXT_HTML_UTF_8)
            .await
            .unwrap();
        store
            .put("E1/PL/c.json", b"{}".to_vec(), &mime::APPLICATION_JSON)
            .await
            .unwrap();

        assert_eq!(
            store.list("E1/BS/").await.unwrap(),
            vec!["E1/BS/a.json".to_string(), "E1/BS/b.html".to_string()]
        );
        assert_eq!(store.get("E1/BS/b.html").await.unwrap(), Some(b"<p/>".to_vec()));
        assert_eq!(
            store.content_type("E1/BS/b.html").await.as_deref(),
            Some("text/html; charset=utf-8")
        );

        store.delete("E1/BS/a.json").await.unwrap();
        store.delete("missing").await.unwrap();
        assert!(!store.exists("E1/BS/a.json").await.unwrap());
        assert_eq!(store.len().await, 2);
    }
}
