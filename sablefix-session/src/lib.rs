/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # SableFix Session
//!
//! FIX-style session layer protocol engine.
//!
//! This crate provides:
//! - **Session**: Composition root owning identity, sequence counters, and
//!   the serialized ingress/egress pipeline
//! - **Sequence management**: Gap and duplicate classification of inbound
//!   sequence numbers
//! - **Admin state machine**: Handlers for the seven session-level message
//!   kinds (Logon, Logout, Heartbeat, TestRequest, ResendRequest,
//!   SequenceReset, Reject)
//! - **Heartbeat monitoring**: Timer-driven liveness detection and keep-alive
//!   traffic
//! - **Configuration**: Session configuration options
//!
//! One [`Session`] instance represents one logical conversation between two
//! counterparties. The transport and wire codec are external collaborators:
//! decoded inbound messages enter through [`Session::incoming`], outbound
//! messages leave as [`SessionEvent::Send`] notifications.

mod admin;
pub mod config;
pub mod events;
pub mod handler;
pub mod heartbeat;
pub mod sequence;
pub mod session;

pub use config::{SessionConfig, SessionRole};
pub use events::{EventReceiver, SessionEvent};
pub use handler::{HandlerOutcome, MessageHandler};
pub use heartbeat::{HeartbeatCheck, HeartbeatMonitor, Liveness};
pub use sequence::{Classification, SequenceNumbers};
pub use session::Session;
