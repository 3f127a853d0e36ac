/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application extension point for inbound message processing.
//!
//! Handlers registered through [`crate::Session::on`] run before the
//! built-in admin handling, in registration order. Each handler resolves to
//! exactly one [`HandlerOutcome`]; returning `Continue` advances the chain,
//! anything else ends it for the current message.
//!
//! Handlers run with the session state lock released, so they may call
//! [`crate::Session::send`] or [`crate::Session::incoming`] re-entrantly,
//! or register further handlers; a handler registered for the type
//! currently being processed takes effect from the next message.

use crate::session::Session;
use sablefix_core::{Message, SessionError};

/// Resolution of one handler invocation.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Advance to the next handler in the chain.
    Continue,
    /// Processing failed; resolves to a Reject, or session termination if the
    /// offending message is a Logon.
    Fail(SessionError),
    /// Reply with a message and end the chain. An ignore-marked message
    /// (see [`Message::no_reply`]) ends the chain without transmitting.
    Respond(Message),
}

/// An application message handler.
///
/// The `session` reference allows sending additional messages or feeding
/// follow-up inbound messages from inside the handler.
pub trait MessageHandler: Send {
    /// Processes one inbound message.
    fn on_message(&mut self, session: &Session, msg: &Message) -> HandlerOutcome;
}

impl<F> MessageHandler for F
where
    F: FnMut(&Session, &Message) -> HandlerOutcome + Send,
{
    fn on_message(&mut self, session: &Session, msg: &Message) -> HandlerOutcome {
        self(session, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_handler() {
        fn assert_handler<H: MessageHandler>(_h: H) {}
        assert_handler(|_session: &Session, _msg: &Message| HandlerOutcome::Continue);
    }
}
