use serde::{Deserialize, Serialize};

/// Version number of a document, used for optimistic concurrency control.
///
/// A freshly inserted document is at version 0 and every accepted change
/// moves it to the next version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a newly inserted document.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the version this one replaced, if any.
    pub fn previous(&self) -> Option<Self> {
        (self.0 > 0).then(|| Self(self.0 - 1))
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_zero() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::default(), Version::initial());
    }

    #[test]
    fn next_and_previous_are_inverse() {
        let v = Version::new(4);
        assert_eq!(v.next().previous(), Some(v));
        assert_eq!(v.next().as_i64(), 5);
    }

    #[test]
    fn initial_has_no_previous() {
        assert_eq!(Version::initial().previous(), None);
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_value(Version::new(3)).unwrap(), 3);
    }
}
