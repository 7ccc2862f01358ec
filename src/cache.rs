//! Last-good snapshot store used when a provider fails
//!
//! Entries are postcard-encoded with an absolute expiry and kept in a fjall
//! keyspace. Disk access runs on the blocking pool.

use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::CompassError;

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

pub struct PersistentCache {
    store: Keyspace,
    ttl: Duration,
}

fn cache_err(err: impl std::fmt::Display) -> CompassError {
    CompassError::cache(err.to_string())
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>, CompassError> {
    Ok(store.get(key).map_err(cache_err)?.map(|v| v.to_vec()))
}

fn now_secs() -> Result<u64, CompassError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(cache_err)?
        .as_secs())
}

impl PersistentCache {
    /// Open (or create) the cache database under `path`, creating missing directories
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, CompassError> {
        std::fs::create_dir_all(path.as_ref())?;
        let db = fjall::Database::builder(&path).open().map_err(cache_err)?;
        let items = db
            .keyspace("snapshots", fjall::KeyspaceCreateOptions::default)
            .map_err(cache_err)?;
        Ok(PersistentCache { store: items, ttl })
    }

    /// Stores a serializable value under the configured TTL, jittered by ±10%
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), CompassError> {
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        let ttl = self.ttl.mul_f64(jitter);
        self.put_with_ttl(key, value, ttl).await
    }

    pub async fn put_with_ttl<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<(), CompassError> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = now_secs()?.saturating_add(ttl.as_secs());
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry).map_err(cache_err)?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(cache_err)?
            .map_err(cache_err)?;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CompassError> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> = task::spawn_blocking(move || get_from_store(store, key_bytes))
            .await
            .map_err(cache_err)??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes).map_err(cache_err)?;
        if now_secs()? < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<(), CompassError> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(cache_err)?
            .map_err(cache_err)?;
        Ok(())
    }
}
