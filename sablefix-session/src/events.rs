/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Lifecycle notifications emitted by a session.
//!
//! These are the only externally observable events of the engine. The
//! embedding application drains the [`EventReceiver`] handed out by
//! [`crate::Session::new`]; in particular it must forward
//! [`SessionEvent::Send`] payloads to the transport collaborator.

use sablefix_core::{Message, SessionError};
use tokio::sync::mpsc;

/// Receiving half of the session event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Events emitted outward by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The logon handshake completed and the session is active.
    LoggedOn,
    /// A logout sequence completed.
    LoggedOut,
    /// The session terminated; all timers are cancelled. Terminal event.
    Ended,
    /// A session-level error. Fatal only when followed by [`SessionEvent::Ended`].
    Error(SessionError),
    /// An outbound message for the transport to serialize and write.
    Send(Message),
}

impl SessionEvent {
    /// Returns the outbound message if this is a `Send` event.
    #[must_use]
    pub fn into_send(self) -> Option<Message> {
        match self {
            Self::Send(msg) => Some(msg),
            _ => None,
        }
    }
}
