/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # SableFix
//!
//! A FIX-style session layer protocol engine for Rust.
//!
//! SableFix implements the session layer of FIX-style financial messaging:
//! the logon/logout handshake, sequence-number gap and duplicate detection,
//! heartbeat-based liveness monitoring, and serialized in-order processing
//! of inbound messages. Wire encoding and network transport are external
//! collaborators.
//!
//! ## Quick Start
//!
//! ```rust
//! use sablefix::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = SessionConfig::new(
//!         CompId::new("SERVER").unwrap(),
//!         CompId::new("CLIENT").unwrap(),
//!         SessionRole::Acceptor,
//!     );
//!     let (session, mut events) = Session::new(config);
//!
//!     // React to inbound orders.
//!     session.on(MsgType::NewOrderSingle, |_session: &Session, _msg: &Message| {
//!         HandlerOutcome::Respond(Message::new(MsgType::ExecutionReport))
//!     });
//!
//!     // Feed decoded inbound messages and forward Send events to the
//!     // transport.
//!     session.incoming(Message::logon(30).with(tags::MSG_SEQ_NUM, 1u64));
//!     while let Ok(event) = events.try_recv() {
//!         if let Some(outbound) = event.into_send() {
//!             // hand `outbound` to the codec and socket
//!             let _ = outbound;
//!         }
//!     }
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Message model, field tags, and error definitions
//! - [`session`]: Session layer protocol implementation

pub mod core {
    //! Message model, field tags, and error definitions.
    pub use sablefix_core::*;
}

pub mod session {
    //! Session layer protocol implementation.
    pub use sablefix_session::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use sablefix_core::{
        CompId, Field, FieldError, FieldTag, Message, MsgType, Result, SeqNum, SessionError,
        Timestamp, tags,
    };

    // Session
    pub use sablefix_session::{
        EventReceiver, HandlerOutcome, HeartbeatMonitor, Liveness, MessageHandler, Session,
        SessionConfig, SessionEvent, SessionRole,
    };
}
