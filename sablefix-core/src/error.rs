/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the SableFix session engine.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors. The Display strings of [`SessionError`] double as
//! the `Text` payloads of outbound protocol messages (Reject, Logout), so
//! their wording is part of the protocol surface.

use crate::field::FieldTag;
use thiserror::Error;

/// Result type alias using [`SessionError`] as the error type.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by session-layer processing.
///
/// Every variant resolves into a protocol-level outbound message and/or an
/// `error` lifecycle notification; none of them escapes as a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A message other than Logon arrived before the session was established.
    #[error("first message not a logon: {msg_type}")]
    FirstMessageNotLogon {
        /// Type of the offending message.
        msg_type: String,
    },

    /// The MsgSeqNum header field was absent or not an integer.
    #[error("MsgSeqNum must be numeric: {value}")]
    NonNumericSeqNum {
        /// The raw field value, empty if absent.
        value: String,
    },

    /// Inbound sequence number below expectation without PossDupFlag.
    #[error("MsgSeqNum too low, expecting {expected} but received {received}")]
    SequenceTooLow {
        /// Next expected inbound sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// A SequenceReset attempted to lower the expected sequence number.
    #[error("SequenceReset may not decrement sequence numbers")]
    SequenceResetDecrement,

    /// The HeartBtInt field of a Logon was absent or not an integer.
    #[error("invalid heartbeat interval, must be numeric: {value}")]
    InvalidHeartBtInt {
        /// The raw field value, empty if absent.
        value: String,
    },

    /// No application handler is registered for a non-admin message type.
    #[error("unsupported message type: {msg_type}")]
    UnsupportedMsgType {
        /// The unhandled message type.
        msg_type: String,
    },

    /// The counterparty went silent past twice the heartbeat interval.
    #[error("no heartbeat from counter party in {elapsed_ms} milliseconds")]
    HeartbeatTimeout {
        /// Milliseconds since the last inbound message.
        elapsed_ms: u64,
    },

    /// A handler exceeded the per-invocation watchdog bound. Non-fatal.
    #[error("message handler taking too long to execute: {msg_type}")]
    SlowHandler {
        /// Type of the message being handled.
        msg_type: String,
        /// Observed handler execution time in milliseconds.
        elapsed_ms: u64,
    },

    /// The counterparty rejected one of our messages.
    #[error("message rejected: {text}")]
    Rejected {
        /// The Text field of the inbound Reject.
        text: String,
    },

    /// A required message field was missing or malformed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Application handler failure with free-form text.
    #[error("{0}")]
    App(String),
}

/// Errors accessing fields of a [`crate::Message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Field not present in the message.
    #[error("missing field: tag {tag}")]
    Missing {
        /// The absent field tag.
        tag: FieldTag,
    },

    /// Field present but its value failed to parse as the requested type.
    #[error("invalid value for tag {tag}: {value}")]
    Invalid {
        /// The field tag.
        tag: FieldTag,
        /// The raw field value.
        value: String,
    },
}
