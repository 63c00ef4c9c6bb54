//! Ledger Events
//!
//! Events are recorded only when a call commits, so a rolled-back deposit
//! leaves no trace in the log. They can be indexed off-chain to feed the
//! reward determination that consumes claimed points.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use crate::types::{Address, Timestamp, TokenId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Deposit Events (0x01 - 0x1F)
    Deposited = 0x01,

    // Points Events (0x20 - 0x3F)
    PointsSettled = 0x20,
    PointsClaimed = 0x21,

    // Admin Events (0x80 - 0x9F)
    DepositsStopped = 0x80,
}

/// Main event enum containing all ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LedgerEvent {
    /// Emitted when a deposit commits
    Deposited {
        user: Address,
        token: TokenId,
        amount: u128,
        normalized: u128,
        new_rate: u128,
        timestamp: Timestamp,
    },

    /// Emitted when a settlement added points
    PointsSettled {
        user: Address,
        delta_points: u128,
        new_balance: u128,
        timestamp: Timestamp,
    },

    /// Emitted when the claim manager zeroes a user's points
    PointsClaimed {
        user: Address,
        points: u128,
        timestamp: Timestamp,
    },

    /// Emitted when the owner stops deposits
    DepositsStopped {
        by: Address,
        timestamp: Timestamp,
    },
}

impl LedgerEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Deposited { .. } => EventType::Deposited,
            Self::PointsSettled { .. } => EventType::PointsSettled,
            Self::PointsClaimed { .. } => EventType::PointsClaimed,
            Self::DepositsStopped { .. } => EventType::DepositsStopped,
        }
    }

    /// Get the time the event occurred
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Deposited { timestamp, .. } => *timestamp,
            Self::PointsSettled { timestamp, .. } => *timestamp,
            Self::PointsClaimed { timestamp, .. } => *timestamp,
            Self::DepositsStopped { timestamp, .. } => *timestamp,
        }
    }
}

/// Event log for collecting events across calls
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<LedgerEvent> {
        self.events
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = LedgerEvent::Deposited {
            user: [1u8; 32],
            token: [2u8; 32],
            amount: 100_000_000,
            normalized: 100_000_000_000_000_000_000,
            new_rate: 100_000_000_000_000_000_000,
            timestamp: 100,
        };

        assert_eq!(event.event_type(), EventType::Deposited);
        assert_eq!(event.timestamp(), 100);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.emit(LedgerEvent::DepositsStopped {
            by: [1u8; 32],
            timestamp: 100,
        });
        log.emit(LedgerEvent::PointsClaimed {
            user: [2u8; 32],
            points: 10,
            timestamp: 100,
        });

        assert!(!log.is_empty());
        assert_eq!(log.events()[1].event_type(), EventType::PointsClaimed);

        let events = log.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp(), 100);
    }
}
