//! The latest rendered exposition document, shared by the scrape task and
//! every HTTP handler.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Cheap-to-clone handle to the current snapshot.
///
/// `publish` swaps the whole string under the write lock and `read` copies
/// it out under the read lock, so readers see either the previous or the
/// next document, never a mix. Neither holds the lock across network I/O.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<String>>,
}

impl SnapshotStore {
    /// An empty snapshot; `/metrics` serves an empty body until the first
    /// cycle publishes.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, text: String) {
        *self.inner.write().await = text;
    }

    pub async fn read(&self) -> String {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty_and_replaces_wholesale() {
        let store = SnapshotStore::new();
        assert_eq!(store.read().await, "");
        store.publish("a 1\n".to_string()).await;
        store.publish("b 2\n".to_string()).await;
        assert_eq!(store.read().await, "b 2\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_partial_documents() {
        let store = SnapshotStore::new();
        let docs: Vec<String> = (0..8)
            .map(|i| format!("metric_{i} {}\n", "x".repeat(4096 * (i + 1))))
            .collect();
        store.publish(docs[0].clone()).await;

        let writer = {
            let store = store.clone();
            let docs = docs.clone();
            tokio::spawn(async move {
                for round in 0..200 {
                    store.publish(docs[round % docs.len()].clone()).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let docs = docs.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = store.read().await;
                    assert!(docs.contains(&seen), "partial snapshot of {} bytes", seen.len());
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.expect("writer");
        for reader in readers {
            reader.await.expect("reader");
        }
    }
}
