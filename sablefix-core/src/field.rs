/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field types for session-layer messages.
//!
//! This module provides:
//! - [`FieldTag`]: Type-safe wrapper for FIX field tag numbers
//! - [`Field`]: Owned tag/value pair stored inside a [`crate::Message`]
//! - [`tags`]: Constants for the session-layer tags the engine reads and writes

use serde::{Deserialize, Serialize};
use std::fmt;

/// FIX field tag number.
///
/// Tags are positive integers that identify fields within a message.
/// Standard tags are defined in the FIX specification (1-5000 range),
/// while user-defined tags use the 5001+ range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct FieldTag(u32);

impl FieldTag {
    /// Creates a new field tag.
    ///
    /// # Arguments
    /// * `tag` - The tag number (must be > 0)
    #[inline]
    #[must_use]
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }

    /// Returns the raw tag number.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns true if this is a standard FIX tag (1-5000).
    #[inline]
    #[must_use]
    pub const fn is_standard(self) -> bool {
        self.0 >= 1 && self.0 <= 5000
    }
}

impl From<u32> for FieldTag {
    fn from(tag: u32) -> Self {
        Self(tag)
    }
}

impl From<FieldTag> for u32 {
    fn from(tag: FieldTag) -> Self {
        tag.0
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned tag/value pair within a message.
///
/// Values are kept in their string form; typed access happens through
/// [`crate::Message::get_as`] at the point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field tag.
    pub tag: FieldTag,
    /// The field value in its wire string form.
    pub value: String,
}

impl Field {
    /// Creates a new field.
    #[must_use]
    pub fn new(tag: FieldTag, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// Session-layer field tag constants.
pub mod tags {
    use super::FieldTag;

    /// BeginSeqNo (tag 7).
    pub const BEGIN_SEQ_NO: FieldTag = FieldTag::new(7);
    /// EndSeqNo (tag 16).
    pub const END_SEQ_NO: FieldTag = FieldTag::new(16);
    /// MsgSeqNum (tag 34).
    pub const MSG_SEQ_NUM: FieldTag = FieldTag::new(34);
    /// NewSeqNo (tag 36).
    pub const NEW_SEQ_NO: FieldTag = FieldTag::new(36);
    /// PossDupFlag (tag 43).
    pub const POSS_DUP_FLAG: FieldTag = FieldTag::new(43);
    /// RefSeqNum (tag 45).
    pub const REF_SEQ_NUM: FieldTag = FieldTag::new(45);
    /// SenderCompID (tag 49).
    pub const SENDER_COMP_ID: FieldTag = FieldTag::new(49);
    /// SendingTime (tag 52).
    pub const SENDING_TIME: FieldTag = FieldTag::new(52);
    /// TargetCompID (tag 56).
    pub const TARGET_COMP_ID: FieldTag = FieldTag::new(56);
    /// Text (tag 58).
    pub const TEXT: FieldTag = FieldTag::new(58);
    /// EncryptMethod (tag 98).
    pub const ENCRYPT_METHOD: FieldTag = FieldTag::new(98);
    /// HeartBtInt (tag 108).
    pub const HEART_BT_INT: FieldTag = FieldTag::new(108);
    /// TestReqID (tag 112).
    pub const TEST_REQ_ID: FieldTag = FieldTag::new(112);
    /// GapFillFlag (tag 123).
    pub const GAP_FILL_FLAG: FieldTag = FieldTag::new(123);
    /// RefMsgType (tag 372).
    pub const REF_MSG_TYPE: FieldTag = FieldTag::new(372);
}
