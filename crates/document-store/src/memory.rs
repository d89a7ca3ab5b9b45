use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Document, Filter, Result, StoreError, Version, store::VersionedStore};

/// In-memory document store for tests and single-process deployments.
///
/// All checks and writes for one call happen under a single write lock, so
/// conditional writes are atomic exactly like their PostgreSQL counterparts.
pub struct InMemoryStore<D: Document> {
    docs: Arc<RwLock<BTreeMap<D::Id, D>>>,
}

impl<D: Document> Clone for InMemoryStore<D> {
    fn clone(&self) -> Self {
        Self {
            docs: Arc::clone(&self.docs),
        }
    }
}

impl<D: Document> Default for InMemoryStore<D> {
    fn default() -> Self {
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<D: Document> InMemoryStore<D> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Removes every document.
    pub async fn clear(&self) {
        self.docs.write().await.clear();
    }

    fn check_unique(docs: &BTreeMap<D::Id, D>, doc: &D) -> Result<()> {
        let Some(key) = doc.unique_key() else {
            return Ok(());
        };
        let id = doc.id();
        let taken = docs
            .values()
            .any(|other| other.id() != id && other.unique_key().as_deref() == Some(key.as_str()));
        if taken {
            return Err(StoreError::UniqueViolation {
                collection: D::COLLECTION,
                key,
            });
        }
        Ok(())
    }

    fn check_version(current: Option<&D>, id: D::Id, expected: Version) -> Result<()> {
        match current {
            None => Err(StoreError::NotFound {
                collection: D::COLLECTION,
                id: id.to_string(),
            }),
            Some(doc) if doc.version() != expected => Err(StoreError::VersionConflict {
                collection: D::COLLECTION,
                id: id.to_string(),
                expected,
                actual: doc.version(),
            }),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl<D: Document> VersionedStore<D> for InMemoryStore<D> {
    async fn get(&self, id: D::Id) -> Result<Option<D>> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    async fn insert(&self, doc: &D) -> Result<()> {
        let mut docs = self.docs.write().await;
        let id = doc.id();
        if docs.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                collection: D::COLLECTION,
                id: id.to_string(),
            });
        }
        Self::check_unique(&docs, doc)?;
        docs.insert(id, doc.clone());
        Ok(())
    }

    async fn put_if_version(&self, doc: &D, expected: Version) -> Result<()> {
        let mut docs = self.docs.write().await;
        let id = doc.id();
        Self::check_version(docs.get(&id), id, expected)?;
        Self::check_unique(&docs, doc)?;
        docs.insert(id, doc.clone());
        Ok(())
    }

    async fn delete_if_version(&self, id: D::Id, expected: Version) -> Result<()> {
        let mut docs = self.docs.write().await;
        Self::check_version(docs.get(&id), id, expected)?;
        docs.remove(&id);
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<D>> {
        let docs = self.docs.read().await;
        let mut found = Vec::new();
        for doc in docs.values() {
            if filter.matches(&serde_json::to_value(doc)?) {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use super::*;
    use crate::StoreExt;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Seat {
        id: Uuid,
        row: String,
        holder: Option<String>,
        version: Version,
    }

    impl Seat {
        fn new(row: &str) -> Self {
            Self {
                id: Uuid::new_v4(),
                row: row.to_string(),
                holder: None,
                version: Version::initial(),
            }
        }
    }

    impl Document for Seat {
        type Id = Uuid;
        const COLLECTION: &'static str = "seats";

        fn id(&self) -> Uuid {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn unique_key(&self) -> Option<String> {
            self.holder.clone()
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        store.insert(&seat).await.unwrap();

        assert_eq!(store.get(seat.id).await.unwrap(), Some(seat.clone()));
        assert!(store.exists(seat.id).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn insert_twice_fails() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        store.insert(&seat).await.unwrap();

        let result = store.insert(&seat).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn require_missing_is_not_found() {
        let store = InMemoryStore::<Seat>::new();
        let result = store.require(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn put_if_version_applies_once() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        store.insert(&seat).await.unwrap();

        let updated = Seat {
            row: "B".to_string(),
            version: seat.version.next(),
            ..seat.clone()
        };
        store
            .put_if_version(&updated, Version::initial())
            .await
            .unwrap();

        let again = store.put_if_version(&updated, Version::initial()).await;
        match again {
            Err(StoreError::VersionConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::new(1));
            }
            other => panic!("expected version conflict, got {other:?}"),
        }
        assert_eq!(store.require(seat.id).await.unwrap().row, "B");
    }

    #[tokio::test]
    async fn put_if_version_on_missing_is_not_found() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        let result = store.put_if_version(&seat, Version::initial()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_if_version_checks_version() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        store.insert(&seat).await.unwrap();

        let stale = store.delete_if_version(seat.id, Version::new(7)).await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));

        store
            .delete_if_version(seat.id, Version::initial())
            .await
            .unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unique_key_is_exclusive_until_released() {
        let store = InMemoryStore::new();
        let mut first = Seat::new("A");
        first.holder = Some("alice".to_string());
        store.insert(&first).await.unwrap();

        let mut second = Seat::new("B");
        second.holder = Some("alice".to_string());
        let result = store.insert(&second).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));

        let released = Seat {
            holder: None,
            version: first.version.next(),
            ..first.clone()
        };
        store
            .put_if_version(&released, first.version)
            .await
            .unwrap();
        store.insert(&second).await.unwrap();
    }

    #[tokio::test]
    async fn updating_holder_keeps_own_key() {
        let store = InMemoryStore::new();
        let mut seat = Seat::new("A");
        seat.holder = Some("alice".to_string());
        store.insert(&seat).await.unwrap();

        let moved = Seat {
            row: "C".to_string(),
            version: seat.version.next(),
            ..seat.clone()
        };
        store.put_if_version(&moved, seat.version).await.unwrap();
    }

    #[tokio::test]
    async fn find_filters_documents() {
        let store = InMemoryStore::new();
        let free = Seat::new("A");
        let mut held = Seat::new("A");
        held.holder = Some("bob".to_string());
        store.insert(&free).await.unwrap();
        store.insert(&held).await.unwrap();
        store.insert(&Seat::new("Z")).await.unwrap();

        let found = store
            .find(&Filter::new().eq("row", "A").is_null("holder"))
            .await
            .unwrap();
        assert_eq!(found, vec![free]);

        let all = store.find(&Filter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(store.any(&Filter::new().eq("holder", "bob")).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_conditional_writes_have_one_winner() {
        let store = InMemoryStore::new();
        let seat = Seat::new("A");
        store.insert(&seat).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let candidate = Seat {
                row: format!("R{i}"),
                version: seat.version.next(),
                ..seat.clone()
            };
            handles.push(tokio::spawn(async move {
                store
                    .put_if_version(&candidate, Version::initial())
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
