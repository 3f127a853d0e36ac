/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session composition root.
//!
//! A [`Session`] owns identity, sequence counters, the pending-message queue,
//! and the heartbeat state for one conversation with one counterparty.
//! Inbound processing is strictly serialized: the `processing` guard and the
//! pending queue guarantee FIFO order with at most one message mid-pipeline.
//!
//! Pipeline per inbound message: sequence validation, then application
//! handlers registered via [`Session::on`] in registration order, then the
//! built-in admin fallback. Handler outcomes resolve per the session rules:
//! an error on a Logon terminates the session, an error on anything else
//! sends a Reject, a returned message is transmitted unless ignore-marked.
//!
//! Timer tasks (heartbeat monitor, logout confirmation) run on the tokio
//! runtime and synchronize with the processing path through the session
//! state lock. The lock is never held across an await point.

use crate::config::SessionConfig;
use crate::events::{EventReceiver, SessionEvent};
use crate::handler::{HandlerOutcome, MessageHandler};
use crate::heartbeat::{HeartbeatMonitor, Liveness};
use crate::sequence::{Classification, SequenceNumbers};
use parking_lot::Mutex;
use sablefix_core::{Message, MsgType, SeqNum, SessionError, Timestamp, tags};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of the sequence validation stage.
enum Validated {
    /// Checks passed; run the handler pipeline.
    Proceed,
    /// Possible duplicate; discard with no response and no state change.
    Drop,
    /// Reply with a recovery message and stop processing this message.
    Reply(Message),
    /// Protocol violation: send the Logout, then terminate the session.
    Fatal(Message),
    /// Validation error; resolved like a handler failure.
    Error(SessionError),
}

/// Mutable per-session state, guarded by the session lock.
pub(crate) struct Core {
    pub(crate) seq: SequenceNumbers,
    pub(crate) logged_in: bool,
    pub(crate) ended: bool,
    /// At most one message traverses the pipeline at a time.
    processing: bool,
    /// Inbound messages awaiting their turn, in arrival order.
    pub(crate) pending: VecDeque<Message>,
    pub(crate) heartbeat: Option<HeartbeatMonitor>,
    pub(crate) heartbeat_task: Option<JoinHandle<()>>,
    pub(crate) logout_confirmation: Option<JoinHandle<()>>,
    pub(crate) respond_to_logon: bool,
    pub(crate) send_heartbeats: bool,
    pub(crate) expect_heartbeats: bool,
}

impl Core {
    fn new(config: &SessionConfig) -> Self {
        Self {
            seq: SequenceNumbers::new(),
            logged_in: false,
            ended: false,
            processing: false,
            pending: VecDeque::new(),
            heartbeat: None,
            heartbeat_task: None,
            logout_confirmation: None,
            respond_to_logon: config.respond_to_logon,
            send_heartbeats: config.send_heartbeats,
            expect_heartbeats: config.expect_heartbeats,
        }
    }
}

type HandlerRegistry = HashMap<MsgType, Vec<Box<dyn MessageHandler>>>;

/// State shared between the session handle and its timer tasks.
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    pub(crate) core: Mutex<Core>,
    handlers: Mutex<HandlerRegistry>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// One logical session between two identified counterparties.
///
/// Cheap to clone; clones share the same underlying state. Created when a
/// connection begins, destroyed by [`Session::end`].
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Creates a session and the receiving half of its event channel.
    ///
    /// The caller drains the receiver for lifecycle notifications and hands
    /// [`SessionEvent::Send`] payloads to the transport.
    #[must_use]
    pub fn new(config: SessionConfig) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let core = Core::new(&config);
        let shared = Arc::new(Shared {
            config,
            core: Mutex::new(core),
            handlers: Mutex::new(HashMap::new()),
            events,
        });
        (Self { shared }, receiver)
    }

    /// Registers an application handler for a message type.
    ///
    /// Handlers run before admin handling, in registration order. May be
    /// called from within a handler; a handler registered for the type
    /// currently being processed takes effect from the next message.
    pub fn on<H: MessageHandler + 'static>(&self, msg_type: MsgType, handler: H) {
        self.shared
            .handlers
            .lock()
            .entry(msg_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Feeds one decoded inbound message into the session.
    ///
    /// If another message is mid-pipeline the message is queued and
    /// processed in arrival order.
    pub fn incoming(&self, msg: Message) {
        self.shared.incoming(msg);
    }

    /// Sends a message to the counterparty.
    ///
    /// Stamps comp IDs, SendingTime, and the next outbound sequence number,
    /// then emits [`SessionEvent::Send`].
    pub fn send(&self, msg: Message) {
        let mut core = self.shared.core.lock();
        self.shared.send_locked(&mut core, msg);
    }

    /// Initiates a logon with the configured heartbeat interval.
    pub fn logon(&self) {
        self.logon_with(std::iter::empty::<(sablefix_core::FieldTag, String)>());
    }

    /// Initiates a logon, merging additional fields into the Logon message.
    pub fn logon_with<I, V>(&self, additional_fields: I)
    where
        I: IntoIterator<Item = (sablefix_core::FieldTag, V)>,
        V: ToString,
    {
        let mut msg = Message::logon(self.shared.config.heartbeat_interval_secs());
        for (tag, value) in additional_fields {
            msg.set(tag, value);
        }
        self.send(msg);
    }

    /// Initiates a logout sequence.
    ///
    /// If the session is logged in, a confirmation timer is armed: should
    /// the counterparty never reply, the session is force-terminated after
    /// the configured logout timeout.
    pub fn logout(&self, reason: Option<&str>) {
        let mut msg = Message::logout();
        if let Some(reason) = reason {
            msg.set(tags::TEXT, reason);
        }

        let mut core = self.shared.core.lock();
        self.shared.send_locked(&mut core, msg);

        if core.logged_in {
            let shared = Arc::downgrade(&self.shared);
            let timeout = self.shared.config.logout_timeout;
            core.logout_confirmation = Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(shared) = shared.upgrade() {
                    warn!("no logout confirmation from counter party, forcing session end");
                    let mut core = shared.core.lock();
                    shared.end_locked(&mut core);
                }
            }));
        }
    }

    /// Terminates the session: cancels all timers, clears the logged-in
    /// flag, and emits [`SessionEvent::Ended`].
    pub fn end(&self) {
        let mut core = self.shared.core.lock();
        self.shared.end_locked(&mut core);
    }

    /// Returns true while the logon handshake has completed and no logout
    /// or termination has occurred.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.shared.core.lock().logged_in
    }

    /// Returns the next expected inbound sequence number.
    #[must_use]
    pub fn next_incoming_seq(&self) -> SeqNum {
        self.shared.core.lock().seq.next_incoming()
    }

    /// Returns the next outbound sequence number to be assigned.
    #[must_use]
    pub fn next_outgoing_seq(&self) -> SeqNum {
        self.shared.core.lock().seq.next_outgoing()
    }

    /// Toggles echoing of inbound Logons (acceptor role).
    pub fn set_respond_to_logon(&self, respond: bool) {
        self.shared.core.lock().respond_to_logon = respond;
    }

    /// Toggles unsolicited outbound Heartbeats.
    pub fn set_send_heartbeats(&self, send: bool) {
        self.shared.core.lock().send_heartbeats = send;
    }

    /// Toggles liveness monitoring of counterparty silence.
    pub fn set_expect_heartbeats(&self, expect: bool) {
        self.shared.core.lock().expect_heartbeats = expect;
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl Shared {
    /// Ingress entry point: serializes processing through the `processing`
    /// guard and the pending queue.
    pub(crate) fn incoming(self: &Arc<Self>, msg: Message) {
        {
            let mut core = self.core.lock();
            if core.ended {
                debug!("dropping inbound message for ended session");
                return;
            }
            if core.processing {
                core.pending.push_back(msg);
                return;
            }
            core.processing = true;
        }

        let mut next = Some(msg);
        while let Some(msg) = next {
            self.process_one(msg);

            let mut core = self.core.lock();
            next = core.pending.pop_front();
            if next.is_none() {
                core.processing = false;
            }
        }
    }

    /// Runs one message through validation, application handlers, and the
    /// admin fallback.
    fn process_one(self: &Arc<Self>, msg: Message) {
        let validated = {
            let mut core = self.core.lock();
            self.validate(&mut core, &msg)
        };

        match validated {
            Validated::Proceed => {}
            Validated::Drop => return,
            Validated::Reply(reply) => {
                let mut core = self.core.lock();
                self.send_locked(&mut core, reply);
                return;
            }
            Validated::Fatal(logout) => {
                let mut core = self.core.lock();
                self.send_locked(&mut core, logout);
                self.end_locked(&mut core);
                return;
            }
            Validated::Error(err) => {
                self.resolve_error(&msg, err);
                return;
            }
        }

        // Application handlers run with both locks released so they can
        // call send/incoming, or register further handlers, re-entrantly.
        // The matching chain is taken out of the registry for the duration
        // and spliced back afterwards.
        let session = Session::from_shared(Arc::clone(self));
        let mut chain = {
            let mut handlers = self.handlers.lock();
            match handlers.get_mut(msg.msg_type()) {
                Some(chain) => std::mem::take(chain),
                None => Vec::new(),
            }
        };
        let had_app_handler = !chain.is_empty();

        let mut verdict = HandlerOutcome::Continue;
        for handler in chain.iter_mut() {
            let started = Instant::now();
            let outcome = handler.on_message(&session, &msg);
            self.watchdog_check(started, &msg);

            match outcome {
                HandlerOutcome::Continue => {}
                other => {
                    verdict = other;
                    break;
                }
            }
        }

        if had_app_handler {
            // Anything registered for this type mid-chain goes after the
            // original handlers, preserving registration order.
            let mut handlers = self.handlers.lock();
            let slot = handlers.entry(msg.msg_type().clone()).or_default();
            let registered_meanwhile = std::mem::replace(slot, chain);
            slot.extend(registered_meanwhile);
        }

        match verdict {
            HandlerOutcome::Continue => {}
            HandlerOutcome::Respond(reply) => {
                self.send_reply(reply);
                return;
            }
            HandlerOutcome::Fail(err) => {
                self.resolve_error(&msg, err);
                return;
            }
        }

        let started = Instant::now();
        let outcome = {
            let mut core = self.core.lock();
            self.admin_dispatch(&mut core, &msg, had_app_handler)
        };
        self.watchdog_check(started, &msg);

        match outcome {
            HandlerOutcome::Continue => {}
            HandlerOutcome::Respond(reply) => self.send_reply(reply),
            HandlerOutcome::Fail(err) => self.resolve_error(&msg, err),
        }
    }

    /// Sequence validation stage. Records inbound liveness, then applies the
    /// session rules in order: logon-first, numeric seq, hard-reset bypass,
    /// gap, duplicate, in-order.
    fn validate(&self, core: &mut Core, msg: &Message) -> Validated {
        if let Some(hb) = &mut core.heartbeat {
            hb.on_received(Instant::now());
        }

        if !core.logged_in && msg.msg_type() != &MsgType::Logon {
            return Validated::Error(SessionError::FirstMessageNotLogon {
                msg_type: msg.msg_type().to_string(),
            });
        }

        let seq = match msg.get_as::<u64>(tags::MSG_SEQ_NUM) {
            Ok(seq) => seq,
            Err(_) => {
                return Validated::Error(SessionError::NonNumericSeqNum {
                    value: msg.get(tags::MSG_SEQ_NUM).unwrap_or_default().to_string(),
                });
            }
        };

        // SequenceReset - Reset ignores message sequencing; the admin
        // handler applies NewSeqNo.
        if msg.msg_type() == &MsgType::SequenceReset
            && msg.get(tags::GAP_FILL_FLAG).is_none_or(|v| v == "N")
        {
            return Validated::Proceed;
        }

        match core.seq.classify(seq) {
            Classification::Gap { expected, received } => {
                debug!(expected, received, "sequence gap detected");
                // Queued messages are past the gap too; the resend supersedes
                // them. EndSeqNo 0 requests everything from BeginSeqNo on.
                core.pending.clear();
                Validated::Reply(Message::resend_request(expected, 0))
            }
            Classification::Duplicate { expected, received } => {
                if msg.get(tags::POSS_DUP_FLAG) == Some("Y") {
                    debug!(expected, received, "possible duplicate dropped");
                    return Validated::Drop;
                }
                warn!(expected, received, "sequence number too low, terminating");
                let text = SessionError::SequenceTooLow { expected, received }.to_string();
                Validated::Fatal(Message::logout().with(tags::TEXT, text))
            }
            Classification::InOrder => {
                core.seq.set_incoming(seq + 1);
                Validated::Proceed
            }
        }
    }

    /// Resolves a handler or validation error: fatal for Logon messages,
    /// a Reject for everything else.
    fn resolve_error(&self, msg: &Message, err: SessionError) {
        warn!(msg_type = %msg.msg_type(), error = %err, "message processing failed");

        let mut core = self.core.lock();
        if msg.msg_type() == &MsgType::Logon {
            self.end_locked(&mut core);
            return;
        }

        let reject = Message::reject(
            msg.get(tags::MSG_SEQ_NUM).unwrap_or("0"),
            msg.msg_type().as_str(),
            &err.to_string(),
        );
        self.send_locked(&mut core, reject);
    }

    fn send_reply(&self, reply: Message) {
        if reply.is_ignore() {
            return;
        }
        let mut core = self.core.lock();
        self.send_locked(&mut core, reply);
    }

    /// Egress sender: stamps session headers, assigns the outbound sequence
    /// number, and hands the message to the transport via the event channel.
    pub(crate) fn send_locked(&self, core: &mut Core, mut msg: Message) {
        msg.set(tags::SENDER_COMP_ID, self.config.sender_comp_id.as_str());
        msg.set(tags::TARGET_COMP_ID, self.config.target_comp_id.as_str());
        msg.set(tags::SENDING_TIME, Timestamp::now().format_millis());
        msg.set(tags::MSG_SEQ_NUM, core.seq.allocate_outgoing());

        if let Some(hb) = &mut core.heartbeat {
            hb.on_sent(Instant::now());
        }

        self.emit(SessionEvent::Send(msg));
    }

    pub(crate) fn end_locked(&self, core: &mut Core) {
        if core.ended {
            return;
        }
        core.ended = true;
        core.logged_in = false;
        core.pending.clear();
        if let Some(task) = core.heartbeat_task.take() {
            task.abort();
        }
        if let Some(task) = core.logout_confirmation.take() {
            task.abort();
        }
        debug!("session ended");
        self.emit(SessionEvent::Ended);
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // The embedder may have dropped the receiver during shutdown.
        let _ = self.events.send(event);
    }

    /// Post-invocation watchdog: a handler that overran the bound yields a
    /// non-fatal diagnostic, never an abort.
    fn watchdog_check(&self, started: Instant, msg: &Message) {
        let elapsed = started.elapsed();
        if elapsed > self.config.handler_watchdog {
            let err = SessionError::SlowHandler {
                msg_type: msg.msg_type().to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            };
            warn!(error = %err, "slow message handler");
            self.emit(SessionEvent::Error(err));
        }
    }

    /// Spawns the recurring heartbeat timer at half-interval cadence.
    /// The task holds only a weak reference; dropping the last session
    /// handle stops it, and session end aborts it.
    pub(crate) fn spawn_heartbeat_task(
        self: &Arc<Self>,
        interval: std::time::Duration,
    ) -> JoinHandle<()> {
        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            let period = interval / 2;
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                if shared.heartbeat_tick() {
                    return;
                }
            }
        })
    }

    /// One heartbeat timer tick. Returns true when the session is over and
    /// the timer should stop.
    fn heartbeat_tick(&self) -> bool {
        let mut core = self.core.lock();
        if core.ended {
            return true;
        }

        let now = Instant::now();
        let Some(hb) = &core.heartbeat else {
            return false;
        };
        let check = hb.check(now);
        let silence = hb.time_since_received(now);

        if core.expect_heartbeats {
            match check.liveness {
                Liveness::Unresponsive => {
                    let err = SessionError::HeartbeatTimeout {
                        elapsed_ms: silence.as_millis() as u64,
                    };
                    warn!(error = %err, "counter party unresponsive");
                    self.emit(SessionEvent::Error(err));
                    self.end_locked(&mut core);
                    return true;
                }
                Liveness::Late if check.send_test_request => {
                    debug!(silence_ms = silence.as_millis() as u64, "provoking counter party");
                    self.send_locked(&mut core, Message::test_request("TEST"));
                    if let Some(hb) = &mut core.heartbeat {
                        hb.on_test_request_sent("TEST");
                    }
                }
                _ => {}
            }
        }

        if check.send_heartbeat && core.send_heartbeats {
            self.send_locked(&mut core, Message::heartbeat());
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionRole;
    use sablefix_core::CompId;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    fn acceptor() -> (Session, EventReceiver) {
        Session::new(SessionConfig::new(
            CompId::new("ACC").unwrap(),
            CompId::new("INI").unwrap(),
            SessionRole::Acceptor,
        ))
    }

    fn logon_msg(seq: u64) -> Message {
        Message::logon(30).with(tags::MSG_SEQ_NUM, seq)
    }

    fn app_msg(seq: u64) -> Message {
        Message::new(MsgType::NewOrderSingle).with(tags::MSG_SEQ_NUM, seq)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn sends(events: &[SessionEvent]) -> Vec<Message> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Send(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Builds a logged-in acceptor with events drained.
    fn logged_in_acceptor() -> (Session, EventReceiver) {
        let (session, mut rx) = acceptor();
        session.incoming(logon_msg(1));
        assert!(session.is_logged_in());
        drain(&mut rx);
        (session, rx)
    }

    #[tokio::test]
    async fn test_first_send_assigns_seq_one() {
        let (session, mut rx) = acceptor();

        session.send(Message::heartbeat());
        session.send(Message::new(MsgType::News));
        session.send(Message::heartbeat());

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].get(tags::MSG_SEQ_NUM), Some("1"));
        assert_eq!(sent[1].get(tags::MSG_SEQ_NUM), Some("2"));
        assert_eq!(sent[2].get(tags::MSG_SEQ_NUM), Some("3"));
    }

    #[tokio::test]
    async fn test_send_stamps_session_headers() {
        let (session, mut rx) = acceptor();

        session.send(Message::heartbeat());

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent[0].get(tags::SENDER_COMP_ID), Some("ACC"));
        assert_eq!(sent[0].get(tags::TARGET_COMP_ID), Some("INI"));
        assert!(sent[0].get(tags::SENDING_TIME).is_some());
    }

    #[tokio::test]
    async fn test_logon_accept_advances_expected_seq() {
        let (session, mut rx) = acceptor();

        session.incoming(logon_msg(1));

        assert!(session.is_logged_in());
        assert_eq!(session.next_incoming_seq().value(), 2);
        let events = drain(&mut rx);
        assert!(events.contains(&SessionEvent::LoggedOn));
        // Acceptor echoes the logon.
        let sent = sends(&events);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Logon);
        assert_eq!(sent[0].get(tags::MSG_SEQ_NUM), Some("1"));
    }

    #[tokio::test]
    async fn test_gap_issues_open_ended_resend_request() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(app_msg(4));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::ResendRequest);
        assert_eq!(sent[0].get(tags::BEGIN_SEQ_NO), Some("2"));
        assert_eq!(sent[0].get(tags::END_SEQ_NO), Some("0"));
        // Expectation is not advanced by the gapped message.
        assert_eq!(session.next_incoming_seq().value(), 2);
        assert!(session.is_logged_in());
    }

    #[tokio::test]
    async fn test_possible_duplicate_dropped_silently() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(app_msg(1).with(tags::POSS_DUP_FLAG, "Y"));

        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.next_incoming_seq().value(), 2);
        assert!(session.is_logged_in());
    }

    #[tokio::test]
    async fn test_seq_too_low_without_dup_flag_terminates() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(app_msg(1));

        let events = drain(&mut rx);
        let sent = sends(&events);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Logout);
        assert_eq!(
            sent[0].get(tags::TEXT),
            Some("MsgSeqNum too low, expecting 2 but received 1")
        );
        assert!(events.contains(&SessionEvent::Ended));
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_first_message_not_logon_rejected() {
        let (session, mut rx) = acceptor();

        session.incoming(app_msg(1));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Reject);
        assert_eq!(sent[0].get(tags::REF_SEQ_NUM), Some("1"));
        assert_eq!(sent[0].get(tags::REF_MSG_TYPE), Some("D"));
        assert_eq!(sent[0].get(tags::TEXT), Some("first message not a logon: D"));
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_non_numeric_seq_rejected() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(Message::new(MsgType::NewOrderSingle).with(tags::MSG_SEQ_NUM, "abc"));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Reject);
        assert_eq!(sent[0].get(tags::TEXT), Some("MsgSeqNum must be numeric: abc"));
    }

    #[tokio::test]
    async fn test_non_numeric_seq_on_logon_is_fatal() {
        let (session, mut rx) = acceptor();

        session.incoming(Message::logon(30).with(tags::MSG_SEQ_NUM, "oops"));

        let events = drain(&mut rx);
        assert!(sends(&events).is_empty());
        assert!(events.contains(&SessionEvent::Ended));
    }

    #[tokio::test]
    async fn test_unsupported_message_type_rejected() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(Message::new(MsgType::Custom("ZZ".into())).with(tags::MSG_SEQ_NUM, 2u64));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Reject);
        assert_eq!(sent[0].get(tags::TEXT), Some("unsupported message type: ZZ"));
        // The message consumed its sequence number before handler dispatch.
        assert_eq!(session.next_incoming_seq().value(), 3);
    }

    #[tokio::test]
    async fn test_app_handler_respond_is_sent() {
        let (session, mut rx) = logged_in_acceptor();
        session.on(MsgType::NewOrderSingle, |_s: &Session, _m: &Message| {
            HandlerOutcome::Respond(Message::new(MsgType::ExecutionReport))
        });

        session.incoming(app_msg(2));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::ExecutionReport);
    }

    #[tokio::test]
    async fn test_app_handler_no_reply_sends_nothing() {
        let (session, mut rx) = logged_in_acceptor();
        session.on(MsgType::NewOrderSingle, |_s: &Session, _m: &Message| {
            HandlerOutcome::Respond(Message::no_reply())
        });

        session.incoming(app_msg(2));

        assert!(sends(&drain(&mut rx)).is_empty());
        assert_eq!(session.next_incoming_seq().value(), 3);
    }

    #[tokio::test]
    async fn test_app_handler_failure_rejects() {
        let (session, mut rx) = logged_in_acceptor();
        session.on(MsgType::NewOrderSingle, |_s: &Session, _m: &Message| {
            HandlerOutcome::Fail(SessionError::App("order validation failed".into()))
        });

        session.incoming(app_msg(2));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Reject);
        assert_eq!(sent[0].get(tags::TEXT), Some("order validation failed"));
        assert!(session.is_logged_in());
    }

    #[tokio::test]
    async fn test_queue_drains_in_arrival_order() {
        let (session, mut rx) = logged_in_acceptor();

        let order = StdArc::new(Mutex::new(Vec::new()));
        let seen = StdArc::clone(&order);
        session.on(MsgType::NewOrderSingle, move |s: &Session, m: &Message| {
            let seq = m.get_as::<u64>(tags::MSG_SEQ_NUM).unwrap();
            seen.lock().push(seq);
            if seq == 2 {
                // Arrivals while mid-pipeline land on the pending queue.
                s.incoming(app_msg(3));
                s.incoming(app_msg(4));
            }
            HandlerOutcome::Continue
        });

        session.incoming(app_msg(2));

        assert_eq!(*order.lock(), vec![2, 3, 4]);
        assert_eq!(session.next_incoming_seq().value(), 5);
        drain(&mut rx);
    }

    #[tokio::test]
    async fn test_handler_can_register_handlers() {
        let (session, mut rx) = logged_in_acceptor();

        let hits = StdArc::new(Mutex::new(0u32));
        let hits_outer = StdArc::clone(&hits);
        session.on(MsgType::NewOrderSingle, move |s: &Session, _m: &Message| {
            let hits_inner = StdArc::clone(&hits_outer);
            s.on(MsgType::News, move |_s: &Session, _m: &Message| {
                *hits_inner.lock() += 1;
                HandlerOutcome::Continue
            });
            HandlerOutcome::Continue
        });

        session.incoming(app_msg(2));
        session.incoming(Message::new(MsgType::News).with(tags::MSG_SEQ_NUM, 3u64));

        // The handler registered mid-processing serves the next message.
        assert_eq!(*hits.lock(), 1);
        assert!(sends(&drain(&mut rx)).is_empty());
        assert_eq!(session.next_incoming_seq().value(), 4);
    }

    #[tokio::test]
    async fn test_slow_handler_emits_diagnostic() {
        let config = SessionConfig::new(
            CompId::new("ACC").unwrap(),
            CompId::new("INI").unwrap(),
            SessionRole::Acceptor,
        )
        .with_handler_watchdog(Duration::from_millis(5));
        let (session, mut rx) = Session::new(config);
        session.incoming(logon_msg(1));
        drain(&mut rx);

        session.on(MsgType::NewOrderSingle, |_s: &Session, _m: &Message| {
            std::thread::sleep(Duration::from_millis(25));
            HandlerOutcome::Respond(Message::new(MsgType::ExecutionReport))
        });

        session.incoming(app_msg(2));

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Error(SessionError::SlowHandler { .. })
        )));
        // The diagnostic is non-fatal: the reply still goes out and the
        // session carries on.
        let sent = sends(&events);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::ExecutionReport);
        assert!(session.is_logged_in());
    }

    #[tokio::test]
    async fn test_gap_discards_queued_messages() {
        let (session, mut rx) = logged_in_acceptor();

        let order = StdArc::new(Mutex::new(Vec::new()));
        let seen = StdArc::clone(&order);
        session.on(MsgType::NewOrderSingle, move |s: &Session, m: &Message| {
            let seq = m.get_as::<u64>(tags::MSG_SEQ_NUM).unwrap();
            seen.lock().push(seq);
            if seq == 2 {
                s.incoming(app_msg(5));
                s.incoming(app_msg(3));
            }
            HandlerOutcome::Continue
        });

        session.incoming(app_msg(2));

        // Seq 5 is a gap: the queued seq 3 behind it is superseded by the
        // resend and never reaches the handlers.
        assert_eq!(*order.lock(), vec![2]);
        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::ResendRequest);
        assert_eq!(sent[0].get(tags::BEGIN_SEQ_NO), Some("3"));
        assert_eq!(session.next_incoming_seq().value(), 3);
    }

    #[tokio::test]
    async fn test_hard_sequence_reset_raises_expected() {
        let (session, mut rx) = logged_in_acceptor();

        // Header seq is ignored for the reset variant.
        session.incoming(
            Message::sequence_reset(false, 10).with(tags::MSG_SEQ_NUM, 99u64),
        );

        assert_eq!(session.next_incoming_seq().value(), 10);
        assert!(sends(&drain(&mut rx)).is_empty());
    }

    #[tokio::test]
    async fn test_sequence_reset_decrement_rejected() {
        let (session, mut rx) = logged_in_acceptor();

        session.incoming(Message::sequence_reset(false, 1).with(tags::MSG_SEQ_NUM, 99u64));

        let sent = sends(&drain(&mut rx));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type(), &MsgType::Reject);
        assert_eq!(
            sent[0].get(tags::TEXT),
            Some("SequenceReset may not decrement sequence numbers")
        );
        assert_eq!(session.next_incoming_seq().value(), 2);
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let (session, mut rx) = logged_in_acceptor();

        session.end();
        session.end();

        let events = drain(&mut rx);
        let ended = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Ended))
            .count();
        assert_eq!(ended, 1);
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_incoming_after_end_is_dropped() {
        let (session, mut rx) = logged_in_acceptor();
        session.end();
        drain(&mut rx);

        session.incoming(app_msg(2));

        assert!(drain(&mut rx).is_empty());
    }
}
