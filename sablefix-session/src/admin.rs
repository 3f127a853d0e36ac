/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Built-in handling of the seven admin message kinds.
//!
//! Admin handling runs after the application handler chain, under the
//! session state lock. Logon drives the handshake and starts the heartbeat
//! timer; Logout implements the initiator-terminates convention; the rest
//! are protocol bookkeeping.

use crate::events::SessionEvent;
use crate::handler::HandlerOutcome;
use crate::heartbeat::HeartbeatMonitor;
use crate::session::{Core, Shared};
use sablefix_core::{Message, MsgType, SessionError, tags};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl Shared {
    /// Fallback stage of the inbound pipeline. Application message kinds
    /// with no registered handler are rejected as unsupported.
    pub(crate) fn admin_dispatch(
        self: &Arc<Self>,
        core: &mut Core,
        msg: &Message,
        had_app_handler: bool,
    ) -> HandlerOutcome {
        match msg.msg_type() {
            MsgType::Logon => self.admin_logon(core, msg),
            MsgType::Logout => self.admin_logout(core),
            MsgType::TestRequest => admin_test_request(msg),
            MsgType::ResendRequest => admin_resend_request(msg),
            MsgType::SequenceReset => admin_sequence_reset(core, msg),
            MsgType::Heartbeat => admin_heartbeat(core, msg),
            MsgType::Reject => self.admin_reject(msg),
            other if had_app_handler => {
                debug!(msg_type = %other, "application message consumed by handler chain");
                HandlerOutcome::Continue
            }
            other => HandlerOutcome::Fail(SessionError::UnsupportedMsgType {
                msg_type: other.to_string(),
            }),
        }
    }

    /// Accepts an inbound Logon: negotiates the heartbeat interval, starts
    /// the liveness timer, and echoes the Logon when acting as acceptor.
    fn admin_logon(self: &Arc<Self>, core: &mut Core, msg: &Message) -> HandlerOutcome {
        let secs = match msg.get_as::<u64>(tags::HEART_BT_INT) {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return HandlerOutcome::Fail(SessionError::InvalidHeartBtInt {
                    value: msg.get(tags::HEART_BT_INT).unwrap_or_default().to_string(),
                });
            }
        };

        let interval = Duration::from_secs(secs);
        core.heartbeat = Some(HeartbeatMonitor::new(interval, Instant::now()));
        if let Some(old) = core.heartbeat_task.replace(self.spawn_heartbeat_task(interval)) {
            old.abort();
        }
        core.logged_in = true;
        info!(heart_bt_secs = secs, "logon accepted");

        if self.config.role.is_acceptor() && core.respond_to_logon {
            // Echo the Logon back; comp IDs, sequence number, and sending
            // time are restamped on egress.
            self.send_locked(core, msg.clone());
        }

        self.emit(SessionEvent::LoggedOn);
        HandlerOutcome::Continue
    }

    /// Logout follows the initiator-terminates convention: the side that
    /// initiated the logout ends the session once it sees the confirmation;
    /// the responding side confirms and waits for the counterparty to
    /// disconnect.
    fn admin_logout(&self, core: &mut Core) -> HandlerOutcome {
        if let Some(timer) = core.logout_confirmation.take() {
            timer.abort();
            core.logged_in = false;
            info!("logout confirmed by counter party");
            self.emit(SessionEvent::LoggedOut);
            self.end_locked(core);
            return HandlerOutcome::Continue;
        }

        info!("logout requested by counter party");
        self.send_locked(core, Message::logout());
        HandlerOutcome::Continue
    }

    /// Surfaces a counterparty Reject as a non-fatal session error.
    fn admin_reject(&self, msg: &Message) -> HandlerOutcome {
        let text = msg.get(tags::TEXT).unwrap_or_default().to_string();
        warn!(%text, "message rejected by counter party");
        self.emit(SessionEvent::Error(SessionError::Rejected { text }));
        HandlerOutcome::Continue
    }
}

/// A TestRequest is answered with a Heartbeat echoing the TestReqID.
fn admin_test_request(msg: &Message) -> HandlerOutcome {
    let mut heartbeat = Message::heartbeat();
    if let Some(id) = msg.get(tags::TEST_REQ_ID) {
        heartbeat.set(tags::TEST_REQ_ID, id);
    }
    HandlerOutcome::Respond(heartbeat)
}

/// A ResendRequest is answered with a hard SequenceReset to EndSeqNo
/// rather than replaying stored messages.
fn admin_resend_request(msg: &Message) -> HandlerOutcome {
    match msg.get_as::<u64>(tags::END_SEQ_NO) {
        Ok(end) => HandlerOutcome::Respond(Message::sequence_reset(false, end)),
        Err(err) => HandlerOutcome::Fail(err.into()),
    }
}

/// Applies a SequenceReset. Gap fills carrying a header sequence number
/// below expectation are stale retransmissions and are discarded; no
/// variant may move the expectation backwards.
fn admin_sequence_reset(core: &mut Core, msg: &Message) -> HandlerOutcome {
    let expected = core.seq.next_incoming().value();
    let gap_fill = msg.get(tags::GAP_FILL_FLAG) == Some("Y");

    if gap_fill
        && msg
            .get_as::<u64>(tags::MSG_SEQ_NUM)
            .is_ok_and(|seq| seq < expected)
    {
        debug!(expected, "stale gap fill discarded");
        return HandlerOutcome::Continue;
    }

    let new_seq = match msg.get_as::<u64>(tags::NEW_SEQ_NO) {
        Ok(new_seq) => new_seq,
        Err(err) => return HandlerOutcome::Fail(err.into()),
    };
    if new_seq < expected {
        return HandlerOutcome::Fail(SessionError::SequenceResetDecrement);
    }

    debug!(new_seq, "sequence reset applied");
    core.seq.set_incoming(new_seq);
    HandlerOutcome::Continue
}

/// An inbound Heartbeat may answer an outstanding TestRequest probe.
fn admin_heartbeat(core: &mut Core, msg: &Message) -> HandlerOutcome {
    if let Some(hb) = &mut core.heartbeat {
        hb.on_test_request_reply(msg.get(tags::TEST_REQ_ID));
    }
    HandlerOutcome::Continue
}
