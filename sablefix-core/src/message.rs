/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message types for the session layer.
//!
//! This module provides:
//! - [`MsgType`]: Enumeration of message types with admin/application split
//! - [`Message`]: Owned field-map message passed between codec, session, and
//!   application handlers, with constructors for every admin message kind

use crate::error::FieldError;
use crate::field::{Field, FieldTag, tags};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Message types understood by the session layer.
///
/// The seven admin kinds drive the session state machine; application kinds
/// are dispatched to registered handlers. Types without a dedicated variant
/// are represented as `Custom(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MsgType {
    /// Heartbeat (0) - Session level.
    #[default]
    Heartbeat,
    /// Test Request (1) - Session level.
    TestRequest,
    /// Resend Request (2) - Session level.
    ResendRequest,
    /// Reject (3) - Session level.
    Reject,
    /// Sequence Reset (4) - Session level.
    SequenceReset,
    /// Logout (5) - Session level.
    Logout,
    /// Logon (A) - Session level.
    Logon,
    /// Execution Report (8).
    ExecutionReport,
    /// News (B).
    News,
    /// New Order Single (D).
    NewOrderSingle,
    /// Order Cancel Request (F).
    OrderCancelRequest,
    /// Market Data Request (V).
    MarketDataRequest,
    /// Custom or unknown message type.
    Custom(String),
}

impl FromStr for MsgType {
    type Err = std::convert::Infallible;

    /// Creates a MsgType from its wire string value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "8" => Self::ExecutionReport,
            "B" => Self::News,
            "D" => Self::NewOrderSingle,
            "F" => Self::OrderCancelRequest,
            "V" => Self::MarketDataRequest,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl MsgType {
    /// Returns the wire string representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::ExecutionReport => "8",
            Self::News => "B",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::MarketDataRequest => "V",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns true if this is an administrative (session-level) message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true if this is an application message.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owned session-layer message.
///
/// A message is a [`MsgType`] tag plus named fields in wire string form.
/// The session engine fills header fields (sequence number, comp IDs,
/// sending time) on egress; the codec collaborator handles bytes.
///
/// A message can carry an `ignore` marker meaning "processed, nothing to
/// transmit" - see [`Message::no_reply`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    msg_type: MsgType,
    fields: SmallVec<[Field; 16]>,
    ignore: bool,
}

impl Message {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(msg_type: MsgType) -> Self {
        Self {
            msg_type,
            fields: SmallVec::new(),
            ignore: false,
        }
    }

    /// Creates an ignore-marked sentinel: the handler chain ends and nothing
    /// is transmitted.
    #[must_use]
    pub fn no_reply() -> Self {
        Self {
            msg_type: MsgType::Custom(String::new()),
            fields: SmallVec::new(),
            ignore: true,
        }
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns true if this message must not be transmitted.
    #[inline]
    #[must_use]
    pub const fn is_ignore(&self) -> bool {
        self.ignore
    }

    /// Gets a field value by tag.
    ///
    /// # Returns
    /// The first field with the given tag, or `None` if absent.
    #[must_use]
    pub fn get(&self, tag: FieldTag) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Gets a field value parsed as the specified type.
    ///
    /// # Errors
    /// Returns [`FieldError`] if the field is absent or fails to parse.
    pub fn get_as<T: FromStr>(&self, tag: FieldTag) -> Result<T, FieldError> {
        let raw = self.get(tag).ok_or(FieldError::Missing { tag })?;
        raw.parse().map_err(|_| FieldError::Invalid {
            tag,
            value: raw.to_string(),
        })
    }

    /// Sets a field value, replacing any existing field with the same tag.
    pub fn set(&mut self, tag: FieldTag, value: impl ToString) -> &mut Self {
        let value = value.to_string();
        if let Some(field) = self.fields.iter_mut().find(|f| f.tag == tag) {
            field.value = value;
        } else {
            self.fields.push(Field::new(tag, value));
        }
        self
    }

    /// Builder form of [`Message::set`].
    #[must_use]
    pub fn with(mut self, tag: FieldTag, value: impl ToString) -> Self {
        self.set(tag, value);
        self
    }

    /// Returns an iterator over all fields.
    #[inline]
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the number of fields in the message.
    #[inline]
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    // Admin message constructors. The codec collaborator surface: the session
    // engine builds its outbound admin traffic through these.

    /// Builds a Heartbeat (0).
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(MsgType::Heartbeat)
    }

    /// Builds a TestRequest (1) with the given TestReqID.
    #[must_use]
    pub fn test_request(test_req_id: &str) -> Self {
        Self::new(MsgType::TestRequest).with(tags::TEST_REQ_ID, test_req_id)
    }

    /// Builds a ResendRequest (2) for the range `begin..=end`.
    ///
    /// `end == 0` means "everything from `begin` forward".
    #[must_use]
    pub fn resend_request(begin: u64, end: u64) -> Self {
        Self::new(MsgType::ResendRequest)
            .with(tags::BEGIN_SEQ_NO, begin)
            .with(tags::END_SEQ_NO, end)
    }

    /// Builds a Reject (3) referencing the offending message.
    #[must_use]
    pub fn reject(ref_seq_num: &str, ref_msg_type: &str, text: &str) -> Self {
        Self::new(MsgType::Reject)
            .with(tags::REF_SEQ_NUM, ref_seq_num)
            .with(tags::REF_MSG_TYPE, ref_msg_type)
            .with(tags::TEXT, text)
    }

    /// Builds a SequenceReset (4).
    ///
    /// `gap_fill` selects the gap-fill variant (GapFillFlag=Y) over the hard
    /// reset (GapFillFlag=N).
    #[must_use]
    pub fn sequence_reset(gap_fill: bool, new_seq_no: u64) -> Self {
        Self::new(MsgType::SequenceReset)
            .with(tags::GAP_FILL_FLAG, if gap_fill { "Y" } else { "N" })
            .with(tags::NEW_SEQ_NO, new_seq_no)
    }

    /// Builds a Logout (5).
    #[must_use]
    pub fn logout() -> Self {
        Self::new(MsgType::Logout)
    }

    /// Builds a Logon (A) with the given heartbeat interval in seconds and
    /// EncryptMethod 0 (none).
    #[must_use]
    pub fn logon(heart_bt_secs: u64) -> Self {
        Self::new(MsgType::Logon)
            .with(tags::HEART_BT_INT, heart_bt_secs)
            .with(tags::ENCRYPT_METHOD, 0)
    }
}
