/// Result of applying an event-driven change.
///
/// Event consumers see the same message more than once and sometimes see
/// messages that no longer apply. Services report those cases here instead
/// of as errors, so consumers can acknowledge them.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The change was applied; carries the new state.
    Applied(T),

    /// The change had already been applied.
    Duplicate(String),

    /// The change can never apply to the current state.
    Rejected(String),

    /// The change waits on another change that has not applied yet.
    Deferred(String),
}

impl<T> Outcome<T> {
    /// Returns the new state if the change was applied.
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}
