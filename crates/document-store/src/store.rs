use std::sync::Arc;

use async_trait::async_trait;

use crate::{Document, Filter, Result, StoreError, Version};

/// Core trait for versioned document stores.
///
/// Every write is atomic per document. Conditional writes compare the
/// stored version with the expected one and only apply when they match,
/// which makes them linearizable per document.
#[async_trait]
pub trait VersionedStore<D: Document>: Send + Sync {
    /// Loads a document by id.
    async fn get(&self, id: D::Id) -> Result<Option<D>>;

    /// Inserts a new document.
    ///
    /// Fails with `AlreadyExists` if the id is taken and with
    /// `UniqueViolation` if another document holds the same unique key.
    async fn insert(&self, doc: &D) -> Result<()>;

    /// Replaces a document if it is still at `expected`.
    ///
    /// The new document carries its own version, normally `expected.next()`.
    /// Fails with `VersionConflict` when the stored version differs and with
    /// `NotFound` when there is nothing to replace.
    async fn put_if_version(&self, doc: &D, expected: Version) -> Result<()>;

    /// Deletes a document if it is still at `expected`.
    async fn delete_if_version(&self, id: D::Id, expected: Version) -> Result<()>;

    /// Returns every document matching the filter, ordered by id.
    async fn find(&self, filter: &Filter) -> Result<Vec<D>>;
}

#[async_trait]
impl<D, T> VersionedStore<D> for Arc<T>
where
    D: Document,
    T: VersionedStore<D> + ?Sized,
{
    async fn get(&self, id: D::Id) -> Result<Option<D>> {
        (**self).get(id).await
    }

    async fn insert(&self, doc: &D) -> Result<()> {
        (**self).insert(doc).await
    }

    async fn put_if_version(&self, doc: &D, expected: Version) -> Result<()> {
        (**self).put_if_version(doc, expected).await
    }

    async fn delete_if_version(&self, id: D::Id, expected: Version) -> Result<()> {
        (**self).delete_if_version(id, expected).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<D>> {
        (**self).find(filter).await
    }
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait StoreExt<D: Document>: VersionedStore<D> {
    /// Checks if a document exists.
    async fn exists(&self, id: D::Id) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Loads a document, failing with `NotFound` if it is absent.
    async fn require(&self, id: D::Id) -> Result<D> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: D::COLLECTION,
            id: id.to_string(),
        })
    }

    /// Returns whether any document matches the filter.
    async fn any(&self, filter: &Filter) -> Result<bool> {
        Ok(!self.find(filter).await?.is_empty())
    }
}

// Blanket implementation for all VersionedStore implementations
impl<D: Document, T: VersionedStore<D> + ?Sized> StoreExt<D> for T {}
