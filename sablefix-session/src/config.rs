/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for sessions. Identity and
//! role are fixed at creation; the behavior flags can additionally be
//! toggled at runtime through the [`crate::Session`] setters.

use sablefix_core::CompId;
use std::time::Duration;

/// Role of this side in establishing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Active side: opens the connection and sends the first Logon.
    Initiator,
    /// Passive side: waits for the counterparty's Logon.
    Acceptor,
}

impl SessionRole {
    /// Returns true for the acceptor role.
    #[must_use]
    pub const fn is_acceptor(self) -> bool {
        matches!(self, Self::Acceptor)
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sender CompID (tag 49).
    pub sender_comp_id: CompId,
    /// Target CompID (tag 56).
    pub target_comp_id: CompId,
    /// Role of this side.
    pub role: SessionRole,
    /// Whether the acceptor echoes an inbound Logon back.
    pub respond_to_logon: bool,
    /// Whether to emit unsolicited Heartbeats when the outbound side is quiet.
    pub send_heartbeats: bool,
    /// Whether counterparty silence is treated as a liveness problem.
    pub expect_heartbeats: bool,
    /// HeartBtInt offered in outbound Logon messages.
    pub heartbeat_interval: Duration,
    /// How long to wait for a Logout confirmation before forcing session end.
    pub logout_timeout: Duration,
    /// Per-handler execution bound; slower handlers produce a diagnostic.
    pub handler_watchdog: Duration,
}

impl SessionConfig {
    /// Creates a new session configuration with default behavior flags.
    ///
    /// # Arguments
    /// * `sender_comp_id` - The sender CompID
    /// * `target_comp_id` - The target CompID
    /// * `role` - Acceptor or initiator
    #[must_use]
    pub fn new(sender_comp_id: CompId, target_comp_id: CompId, role: SessionRole) -> Self {
        Self {
            sender_comp_id,
            target_comp_id,
            role,
            respond_to_logon: true,
            send_heartbeats: true,
            expect_heartbeats: true,
            heartbeat_interval: Duration::from_secs(10),
            logout_timeout: Duration::from_secs(30),
            handler_watchdog: Duration::from_secs(1),
        }
    }

    /// Sets the heartbeat interval offered in outbound Logons.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets whether the acceptor echoes inbound Logons.
    #[must_use]
    pub const fn with_respond_to_logon(mut self, respond: bool) -> Self {
        self.respond_to_logon = respond;
        self
    }

    /// Sets whether unsolicited Heartbeats are sent.
    #[must_use]
    pub const fn with_send_heartbeats(mut self, send: bool) -> Self {
        self.send_heartbeats = send;
        self
    }

    /// Sets whether counterparty silence is monitored.
    #[must_use]
    pub const fn with_expect_heartbeats(mut self, expect: bool) -> Self {
        self.expect_heartbeats = expect;
        self
    }

    /// Sets the logout confirmation timeout.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets the handler watchdog bound.
    #[must_use]
    pub fn with_handler_watchdog(mut self, bound: Duration) -> Self {
        self.handler_watchdog = bound;
        self
    }

    /// Returns the heartbeat interval in whole seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }
}
