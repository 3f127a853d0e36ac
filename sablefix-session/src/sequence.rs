/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Sequence number management.
//!
//! Both counters start at 1 and only move forward, except through an
//! explicit [`SequenceNumbers::set_incoming`] driven by a SequenceReset.
//! The counters live inside the session state lock, so plain integers
//! suffice here.

use sablefix_core::SeqNum;

/// Sequence counters for one session.
#[derive(Debug)]
pub struct SequenceNumbers {
    /// Next expected inbound sequence number.
    next_incoming: u64,
    /// Next outbound sequence number to assign.
    next_outgoing: u64,
}

impl SequenceNumbers {
    /// Creates sequence counters starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_incoming: 1,
            next_outgoing: 1,
        }
    }

    /// Returns the next expected inbound sequence number.
    #[inline]
    #[must_use]
    pub fn next_incoming(&self) -> SeqNum {
        SeqNum::new(self.next_incoming)
    }

    /// Returns the next outbound sequence number without allocating it.
    #[inline]
    #[must_use]
    pub fn next_outgoing(&self) -> SeqNum {
        SeqNum::new(self.next_outgoing)
    }

    /// Allocates and returns the next outbound sequence number.
    #[inline]
    pub fn allocate_outgoing(&mut self) -> SeqNum {
        let seq = self.next_outgoing;
        self.next_outgoing += 1;
        SeqNum::new(seq)
    }

    /// Sets the next expected inbound sequence number.
    ///
    /// Used when accepting an in-order message (`received + 1`) and when a
    /// SequenceReset raises the expectation.
    #[inline]
    pub fn set_incoming(&mut self, seq: u64) {
        self.next_incoming = seq;
    }

    /// Classifies an inbound sequence number against expectation.
    #[must_use]
    pub fn classify(&self, received: u64) -> Classification {
        let expected = self.next_incoming;
        if received == expected {
            Classification::InOrder
        } else if received > expected {
            Classification::Gap { expected, received }
        } else {
            Classification::Duplicate { expected, received }
        }
    }
}

impl Default for SequenceNumbers {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of classifying an inbound sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Sequence number matches expectation.
    InOrder,
    /// Sequence number is higher than expected: messages were missed.
    Gap {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// Sequence number is lower than expected: possible retransmission.
    Duplicate {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_counters() {
        let seq = SequenceNumbers::new();
        assert_eq!(seq.next_incoming().value(), 1);
        assert_eq!(seq.next_outgoing().value(), 1);
    }

    #[test]
    fn test_allocate_outgoing() {
        let mut seq = SequenceNumbers::new();
        assert_eq!(seq.allocate_outgoing().value(), 1);
        assert_eq!(seq.allocate_outgoing().value(), 2);
        assert_eq!(seq.next_outgoing().value(), 3);
    }

    #[test]
    fn test_classify() {
        let mut seq = SequenceNumbers::new();
        assert_eq!(seq.classify(1), Classification::InOrder);

        seq.set_incoming(5);
        assert_eq!(
            seq.classify(4),
            Classification::Duplicate {
                expected: 5,
                received: 4
            }
        );
        assert_eq!(seq.classify(5), Classification::InOrder);
        assert_eq!(
            seq.classify(10),
            Classification::Gap {
                expected: 5,
                received: 10
            }
        );
    }

    #[test]
    fn test_set_incoming() {
        let mut seq = SequenceNumbers::new();
        seq.set_incoming(42);
        assert_eq!(seq.next_incoming().value(), 42);
        assert_eq!(seq.classify(42), Classification::InOrder);
    }
}
