//! Order status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──┬──► Complete
///           └──► Cancelled
/// ```
///
/// Both `Complete` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The order holds the item and is awaiting payment.
    #[default]
    Created,

    /// Payment was recorded (terminal state).
    Complete,

    /// The owner cancelled the order (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Statuses that hold a reservation on their item.
    pub const ACTIVE: [OrderStatus; 2] = [OrderStatus::Created, OrderStatus::Complete];

    /// Returns true if a payment can complete the order in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the owner can cancel the order in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if this order keeps its item reserved.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Complete)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Complete | OrderStatus::Cancelled)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Complete => "complete",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string is not a known order status.
#[derive(Debug, Error)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(String);

impl std::str::FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "complete" => Ok(OrderStatus::Complete),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_only_created_can_complete() {
        assert!(OrderStatus::Created.can_complete());
        assert!(!OrderStatus::Complete.can_complete());
        assert!(!OrderStatus::Cancelled.can_complete());
    }

    #[test]
    fn test_only_created_can_cancel() {
        assert!(OrderStatus::Created.can_cancel());
        assert!(!OrderStatus::Complete.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_active_statuses_hold_the_item() {
        assert!(OrderStatus::Created.is_active());
        assert!(OrderStatus::Complete.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
        assert!(OrderStatus::ACTIVE.iter().all(OrderStatus::is_active));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(OrderStatus::Complete.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_wire_names_match_serde() {
        for status in [
            OrderStatus::Created,
            OrderStatus::Complete,
            OrderStatus::Cancelled,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_unknown_status() {
        assert!("awaiting_payment".parse::<OrderStatus>().is_err());
    }
}
