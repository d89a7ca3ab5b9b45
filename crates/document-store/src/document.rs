use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Serialize, de::DeserializeOwned};

use crate::Version;

/// A document that can be kept in a [`VersionedStore`](crate::VersionedStore).
///
/// Documents are stored as JSON; filters address their top-level fields by
/// the serialized field name.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier type. Its `Display` form is the storage key.
    type Id: Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static;

    /// Name of the collection documents of this type live in.
    const COLLECTION: &'static str;

    fn id(&self) -> Self::Id;

    fn version(&self) -> Version;

    /// A key that at most one document in the collection may hold at a time.
    ///
    /// Returning `None` releases the key, so a document can claim a key only
    /// while it is in some state.
    fn unique_key(&self) -> Option<String> {
        None
    }
}
