//! The order state machine.
//!
//! Terminal statuses are absorbing: no event moves an order out of Filled,
//! Canceled, Rejected or Expired. Attempted transitions outside the table
//! return `None` and leave the order unchanged.

use crate::types::OrderStatus;

/// Events that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// All validators passed; the order is admitted.
    Validate,
    /// A validator failed after the order record was created.
    Reject,
    /// A fill left quantity open.
    FillPartial,
    /// A fill completed the order.
    FillFull,
    /// Explicit owner cancel.
    Cancel,
    /// The expiry sweeper hit `expires_at`.
    Expire,
}

/// The legal transition for `(from, event)`, or `None` when the pair is
/// outside the table.
pub fn transition(from: OrderStatus, event: LifecycleEvent) -> Option<OrderStatus> {
    use LifecycleEvent::*;
    use OrderStatus::*;

    match (from, event) {
        (New, Validate) => Some(Pending),
        (New, Reject) => Some(Rejected),
        (New, Cancel) => Some(Canceled),
        (New, Expire) => Some(Expired),
        (Pending, FillPartial) => Some(PartiallyFilled),
        (Pending, FillFull) => Some(Filled),
        (Pending, Cancel) => Some(Canceled),
        (Pending, Expire) => Some(Expired),
        (Pending, Reject) => Some(Rejected),
        (PartiallyFilled, FillPartial) => Some(PartiallyFilled),
        (PartiallyFilled, FillFull) => Some(Filled),
        (PartiallyFilled, Cancel) => Some(Canceled),
        (PartiallyFilled, Expire) => Some(Expired),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent::*;
    use OrderStatus::*;

    const ALL_STATUSES: [OrderStatus; 7] = [
        New,
        Pending,
        PartiallyFilled,
        Filled,
        Canceled,
        Rejected,
        Expired,
    ];
    const ALL_EVENTS: [LifecycleEvent; 6] =
        [Validate, Reject, FillPartial, FillFull, Cancel, Expire];

    #[test]
    fn test_core_table() {
        assert_eq!(transition(New, Validate), Some(Pending));
        assert_eq!(transition(New, Reject), Some(Rejected));
        assert_eq!(transition(Pending, FillPartial), Some(PartiallyFilled));
        assert_eq!(transition(Pending, FillFull), Some(Filled));
        assert_eq!(transition(Pending, Cancel), Some(Canceled));
        assert_eq!(transition(Pending, Expire), Some(Expired));
        assert_eq!(transition(PartiallyFilled, FillFull), Some(Filled));
        assert_eq!(transition(PartiallyFilled, Cancel), Some(Canceled));
    }

    #[test]
    fn test_terminal_statuses_are_absorbing() {
        for status in [Filled, Canceled, Rejected, Expired] {
            for event in ALL_EVENTS {
                assert_eq!(transition(status, event), None, "{status} + {event:?}");
            }
        }
    }

    #[test]
    fn test_no_transition_reenters_new() {
        for status in ALL_STATUSES {
            for event in ALL_EVENTS {
                assert_ne!(transition(status, event), Some(New));
            }
        }
    }

    #[test]
    fn test_fills_never_leave_new() {
        assert_eq!(transition(New, FillPartial), None);
        assert_eq!(transition(New, FillFull), None);
    }
}
