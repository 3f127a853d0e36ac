/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and liveness monitoring.
//!
//! This module holds the timing state behind the per-session heartbeat
//! timer:
//! - outbound Heartbeats when nothing has been sent within the interval
//! - a TestRequest when the counterparty is late (past 1.5x the interval)
//! - declaring the counterparty unresponsive past 2x the interval
//!
//! The monitor is pure state: the timer task in the session calls
//! [`HeartbeatMonitor::check`] on each tick and acts on the result. While a
//! TestRequest is outstanding no further one is issued; a Heartbeat carrying
//! the matching TestReqID clears it.

use std::time::Duration;
use tokio::time::Instant;

/// Counterparty liveness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Inbound traffic within bounds.
    Alive,
    /// Silence past 1.5x the interval: provoke a response.
    Late,
    /// Silence past 2x the interval: the counterparty is presumed dead.
    Unresponsive,
}

/// Result of a single monitor tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatCheck {
    /// Liveness of the counterparty.
    pub liveness: Liveness,
    /// True if a TestRequest should go out now.
    pub send_test_request: bool,
    /// True if an unsolicited Heartbeat should go out now.
    pub send_heartbeat: bool,
}

/// Heartbeat timing state for one logged-in session.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    /// Negotiated heartbeat interval.
    interval: Duration,
    /// Time of last outbound message.
    last_sent: Instant,
    /// Time of last inbound message.
    last_received: Instant,
    /// Outstanding TestRequest ID, if any.
    pending_test_request: Option<String>,
}

impl HeartbeatMonitor {
    /// Creates a monitor for the given interval, treating `now` as the time
    /// of the most recent traffic in both directions.
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_sent: now,
            last_received: now,
            pending_test_request: None,
        }
    }

    /// Returns the negotiated heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Records an outbound message.
    #[inline]
    pub fn on_sent(&mut self, now: Instant) {
        self.last_sent = now;
    }

    /// Records an inbound message.
    #[inline]
    pub fn on_received(&mut self, now: Instant) {
        self.last_received = now;
    }

    /// Records that a TestRequest with the given ID went out.
    pub fn on_test_request_sent(&mut self, test_req_id: impl Into<String>) {
        self.pending_test_request = Some(test_req_id.into());
    }

    /// Clears the outstanding TestRequest if the inbound Heartbeat echoes
    /// its ID.
    pub fn on_test_request_reply(&mut self, test_req_id: Option<&str>) {
        if let (Some(pending), Some(received)) = (&self.pending_test_request, test_req_id)
            && pending == received
        {
            self.pending_test_request = None;
        }
    }

    /// Returns the outstanding TestRequest ID, if any.
    #[must_use]
    pub fn pending_test_request(&self) -> Option<&str> {
        self.pending_test_request.as_deref()
    }

    /// Returns the time since the last inbound message.
    #[must_use]
    pub fn time_since_received(&self, now: Instant) -> Duration {
        now.duration_since(self.last_received)
    }

    /// Evaluates the monitor at `now`.
    #[must_use]
    pub fn check(&self, now: Instant) -> HeartbeatCheck {
        let since_received = now.duration_since(self.last_received);
        let since_sent = now.duration_since(self.last_sent);

        let liveness = if since_received > self.interval * 2 {
            Liveness::Unresponsive
        } else if since_received > self.interval * 3 / 2 {
            Liveness::Late
        } else {
            Liveness::Alive
        };

        HeartbeatCheck {
            liveness,
            send_test_request: liveness == Liveness::Late && self.pending_test_request.is_none(),
            send_heartbeat: since_sent > self.interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_at(now: Instant) -> HeartbeatMonitor {
        HeartbeatMonitor::new(Duration::from_secs(10), now)
    }

    #[test]
    fn test_monitor_reports_interval() {
        let monitor = monitor_at(Instant::now());
        assert_eq!(monitor.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_quiet_session_is_alive() {
        let now = Instant::now();
        let monitor = monitor_at(now);

        let check = monitor.check(now + Duration::from_secs(5));
        assert_eq!(check.liveness, Liveness::Alive);
        assert!(!check.send_test_request);
        assert!(!check.send_heartbeat);
    }

    #[test]
    fn test_heartbeat_due_after_interval() {
        let now = Instant::now();
        let monitor = monitor_at(now);

        let check = monitor.check(now + Duration::from_secs(11));
        assert!(check.send_heartbeat);
    }

    #[test]
    fn test_sending_resets_heartbeat_clock() {
        let now = Instant::now();
        let mut monitor = monitor_at(now);
        monitor.on_sent(now + Duration::from_secs(11));

        let check = monitor.check(now + Duration::from_secs(12));
        assert!(!check.send_heartbeat);
    }

    #[test]
    fn test_late_counterparty_provokes_test_request() {
        let now = Instant::now();
        let monitor = monitor_at(now);

        let check = monitor.check(now + Duration::from_secs(16));
        assert_eq!(check.liveness, Liveness::Late);
        assert!(check.send_test_request);
    }

    #[test]
    fn test_pending_test_request_suppresses_another() {
        let now = Instant::now();
        let mut monitor = monitor_at(now);
        monitor.on_test_request_sent("TEST");

        let check = monitor.check(now + Duration::from_secs(16));
        assert_eq!(check.liveness, Liveness::Late);
        assert!(!check.send_test_request);
    }

    #[test]
    fn test_matching_reply_clears_pending() {
        let now = Instant::now();
        let mut monitor = monitor_at(now);
        monitor.on_test_request_sent("TEST");

        monitor.on_test_request_reply(Some("OTHER"));
        assert_eq!(monitor.pending_test_request(), Some("TEST"));

        monitor.on_test_request_reply(Some("TEST"));
        assert!(monitor.pending_test_request().is_none());
    }

    #[test]
    fn test_unresponsive_past_double_interval() {
        let now = Instant::now();
        let monitor = monitor_at(now);

        let check = monitor.check(now + Duration::from_secs(21));
        assert_eq!(check.liveness, Liveness::Unresponsive);
    }

    #[test]
    fn test_inbound_traffic_keeps_alive() {
        let now = Instant::now();
        let mut monitor = monitor_at(now);
        monitor.on_received(now + Duration::from_secs(15));

        let check = monitor.check(now + Duration::from_secs(20));
        assert_eq!(check.liveness, Liveness::Alive);
    }
}
