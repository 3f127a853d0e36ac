/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # SableFix Core
//!
//! Core message model for the SableFix session engine.
//!
//! This crate provides:
//! - **Message model**: [`Message`] field-map messages and the [`MsgType`] enumeration
//! - **Fields**: [`FieldTag`] and the session-layer tag constants in [`field::tags`]
//! - **Types**: [`SeqNum`], [`CompId`], and [`Timestamp`]
//! - **Errors**: [`SessionError`] and [`FieldError`] via `thiserror`
//!
//! Wire encoding and decoding is deliberately absent: a codec collaborator
//! produces and consumes [`Message`] values at the session boundary.

pub mod error;
pub mod field;
pub mod message;
pub mod types;

pub use error::{FieldError, Result, SessionError};
pub use field::{Field, FieldTag, tags};
pub use message::{Message, MsgType};
pub use types::{CompId, SeqNum, Timestamp};
