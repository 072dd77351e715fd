//! NetSDR binary frame codec.
//!
//! NetSDR receivers exchange frames with a 16-bit little-endian header
//! whose low 13 bits carry the total frame length (header included) and
//! whose top 3 bits carry the message kind. Control-class frames follow
//! the header with a 16-bit control item code; data-class frames with a
//! 16-bit sequence number. This module is a pure codec with no I/O
//! dependencies -- all functions operate on byte slices and return parsed
//! structures or errors.
//!
//! One wire quirk dominates the layout: the 13-bit length field cannot
//! represent the protocol's maximum data frame (8194 bytes), so that one
//! size is encoded as a length of **0** and decoders must map 0 back to
//! 8194. Control frames never use the sentinel; their 8191-byte ceiling
//! fits the field directly.

use bytes::BufMut;

use netsdr_core::{Error, Result};

/// Frame header size in bytes.
pub const HEADER_LENGTH: usize = 2;

/// Size of the control item code field in bytes.
pub const CONTROL_ITEM_LENGTH: usize = 2;

/// Size of the data-frame sequence number field in bytes.
pub const SEQUENCE_LENGTH: usize = 2;

/// Maximum total length of a control-class frame.
pub const MAX_CONTROL_LENGTH: usize = 8191;

/// Maximum total length of a data-class frame (encoded with the zero
/// sentinel, since it exceeds the 13-bit length field).
pub const MAX_DATA_LENGTH: usize = 8194;

/// Message kind from the top 3 bits of the frame header.
///
/// Kinds 0-3 are control-class (item code follows the header); kinds 4-7
/// are data-class (sequence number follows the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Host sets a control item -- discriminant 0.
    SetControlItem,
    /// Host requests the current value of a control item -- discriminant 1.
    CurrentControlItem,
    /// Host requests the valid range of a control item -- discriminant 2.
    ControlItemRange,
    /// Acknowledgement / NAK from the receiver -- discriminant 3.
    Ack,
    /// Data item stream 0 -- discriminant 4.
    DataItem0,
    /// Data item stream 1 -- discriminant 5.
    DataItem1,
    /// Data item stream 2 -- discriminant 6.
    DataItem2,
    /// Data item stream 3 -- discriminant 7.
    DataItem3,
}

/// All kinds in discriminant order, indexable by the 3-bit header field.
const KINDS: [MessageKind; 8] = [
    MessageKind::SetControlItem,
    MessageKind::CurrentControlItem,
    MessageKind::ControlItemRange,
    MessageKind::Ack,
    MessageKind::DataItem0,
    MessageKind::DataItem1,
    MessageKind::DataItem2,
    MessageKind::DataItem3,
];

impl MessageKind {
    /// The 3-bit wire discriminant.
    pub fn discriminant(self) -> u8 {
        match self {
            MessageKind::SetControlItem => 0,
            MessageKind::CurrentControlItem => 1,
            MessageKind::ControlItemRange => 2,
            MessageKind::Ack => 3,
            MessageKind::DataItem0 => 4,
            MessageKind::DataItem1 => 5,
            MessageKind::DataItem2 => 6,
            MessageKind::DataItem3 => 7,
        }
    }

    /// Whether this kind carries a control item code.
    pub fn is_control(self) -> bool {
        self.discriminant() < 4
    }

    /// Whether this kind carries a sequence number.
    pub fn is_data(self) -> bool {
        !self.is_control()
    }
}

/// A control item the client knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlItem {
    /// Receiver run state (IQ capture start/stop) -- code 0x0018.
    ReceiverState,
    /// Tuning frequency -- code 0x0020.
    ReceiverFrequency,
    /// RF filter selection -- code 0x0044.
    RfFilter,
    /// A/D converter modes -- code 0x008A.
    AdModes,
    /// IQ output data sample rate -- code 0x00B8.
    IqOutputSampleRate,
}

impl ControlItem {
    /// The 16-bit wire code for this item.
    pub fn code(self) -> u16 {
        match self {
            ControlItem::ReceiverState => 0x0018,
            ControlItem::ReceiverFrequency => 0x0020,
            ControlItem::RfFilter => 0x0044,
            ControlItem::AdModes => 0x008A,
            ControlItem::IqOutputSampleRate => 0x00B8,
        }
    }

    /// Map a wire code back to a known item, or `None` if unrecognized.
    pub fn from_code(code: u16) -> Option<ControlItem> {
        match code {
            0x0018 => Some(ControlItem::ReceiverState),
            0x0020 => Some(ControlItem::ReceiverFrequency),
            0x0044 => Some(ControlItem::RfFilter),
            0x008A => Some(ControlItem::AdModes),
            0x00B8 => Some(ControlItem::IqOutputSampleRate),
            _ => None,
        }
    }
}

/// A control item code as decoded off the wire.
///
/// Unrecognized codes do not fail decoding -- the frame is framed
/// correctly but semantically unusable, and callers must be able to tell
/// that apart from garbled bytes. Hence `Known | Unknown` rather than an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCode {
    /// A code from the known control item table.
    Known(ControlItem),
    /// A structurally valid but unrecognized 16-bit code.
    Unknown(u16),
}

impl ItemCode {
    /// Classify a raw wire value.
    pub fn from_raw(raw: u16) -> ItemCode {
        match ControlItem::from_code(raw) {
            Some(item) => ItemCode::Known(item),
            None => ItemCode::Unknown(raw),
        }
    }

    /// The raw 16-bit wire value.
    pub fn raw(self) -> u16 {
        match self {
            ItemCode::Known(item) => item.code(),
            ItemCode::Unknown(raw) => raw,
        }
    }

    /// Whether the code is in the known item table.
    pub fn is_known(self) -> bool {
        matches!(self, ItemCode::Known(_))
    }
}

/// A decoded frame: kind plus class-specific content borrowing the body
/// bytes from the input buffer (no copying).
#[derive(Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    /// The message kind from the header.
    pub kind: MessageKind,
    /// Class-specific fields and body.
    pub content: FrameContent<'a>,
}

/// The class-specific portion of a decoded frame.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameContent<'a> {
    /// Control-class: item code and parameter bytes.
    Control {
        /// The decoded item code, known or not.
        item: ItemCode,
        /// Parameter bytes after the item code.
        body: &'a [u8],
    },
    /// Data-class: sequence number and payload bytes.
    Data {
        /// 16-bit sequence number (wraps).
        sequence: u16,
        /// Payload bytes after the sequence number.
        body: &'a [u8],
    },
}

impl<'a> Frame<'a> {
    /// The body bytes, regardless of frame class.
    pub fn body(&self) -> &'a [u8] {
        match self.content {
            FrameContent::Control { body, .. } => body,
            FrameContent::Data { body, .. } => body,
        }
    }

    /// The item code of a control-class frame.
    pub fn item_code(&self) -> Option<ItemCode> {
        match self.content {
            FrameContent::Control { item, .. } => Some(item),
            FrameContent::Data { .. } => None,
        }
    }

    /// The sequence number of a data-class frame.
    pub fn sequence(&self) -> Option<u16> {
        match self.content {
            FrameContent::Control { .. } => None,
            FrameContent::Data { sequence, .. } => Some(sequence),
        }
    }
}

/// Encode a control-class frame: `header(2) | item_code(2, LE) | body`.
///
/// Fails with [`Error::LengthExceeded`] when the total frame length would
/// exceed [`MAX_CONTROL_LENGTH`]; control frames never use the length
/// sentinel.
pub fn encode_control(kind: MessageKind, item: ControlItem, body: &[u8]) -> Result<Vec<u8>> {
    let total = HEADER_LENGTH + CONTROL_ITEM_LENGTH + body.len();
    if total > MAX_CONTROL_LENGTH {
        return Err(Error::LengthExceeded {
            requested: total,
            max: MAX_CONTROL_LENGTH,
        });
    }

    let header = total as u16 | (u16::from(kind.discriminant()) << 13);

    let mut buf = Vec::with_capacity(total);
    buf.put_u16_le(header);
    buf.put_u16_le(item.code());
    buf.put_slice(body);
    Ok(buf)
}

/// Encode a data-class frame: `header(2) | sequence(2, LE) | body`.
///
/// A frame of exactly [`MAX_DATA_LENGTH`] total bytes encodes its length
/// sub-field as the sentinel 0. Any other total above
/// [`MAX_CONTROL_LENGTH`] is unrepresentable and fails with
/// [`Error::LengthExceeded`].
pub fn encode_data(kind: MessageKind, sequence: u16, body: &[u8]) -> Result<Vec<u8>> {
    let total = HEADER_LENGTH + SEQUENCE_LENGTH + body.len();
    let length_field = if total == MAX_DATA_LENGTH {
        0
    } else if total > MAX_CONTROL_LENGTH {
        return Err(Error::LengthExceeded {
            requested: total,
            max: MAX_DATA_LENGTH,
        });
    } else {
        total as u16
    };

    let header = length_field | (u16::from(kind.discriminant()) << 13);

    let mut buf = Vec::with_capacity(total);
    buf.put_u16_le(header);
    buf.put_u16_le(sequence);
    buf.put_slice(body);
    Ok(buf)
}

/// Decode one frame from the front of `data`.
///
/// Framing is exact-length: the body is exactly what the header declares,
/// and trailing bytes beyond the declared frame are not consumed. Three
/// outcomes are possible:
///
/// - `Ok(frame)` with a known item code (or any data frame),
/// - `Ok(frame)` with [`ItemCode::Unknown`] -- structurally valid, not
///   semantically usable,
/// - `Err` with [`Error::FrameTooShort`] or [`Error::FrameTruncated`] --
///   the bytes do not form a frame and should be dropped.
pub fn decode(data: &[u8]) -> Result<Frame<'_>> {
    if data.len() < HEADER_LENGTH {
        return Err(Error::FrameTooShort { len: data.len() });
    }

    let header = u16::from_le_bytes([data[0], data[1]]);
    let kind = KINDS[(header >> 13) as usize];
    let mut total = usize::from(header & 0x1FFF);

    // Length sentinel: a data frame's 13-bit field cannot hold 8194.
    if kind.is_data() && total == 0 {
        total = MAX_DATA_LENGTH;
    }

    // Both frame classes carry a mandatory 2-byte field after the header.
    if data.len() < HEADER_LENGTH + CONTROL_ITEM_LENGTH {
        return Err(Error::FrameTooShort { len: data.len() });
    }
    let field = u16::from_le_bytes([data[2], data[3]]);

    let body_len = total
        .checked_sub(HEADER_LENGTH + CONTROL_ITEM_LENGTH)
        .ok_or(Error::FrameTruncated {
            declared: total,
            available: data.len(),
        })?;

    if data.len() < total {
        return Err(Error::FrameTruncated {
            declared: total,
            available: data.len(),
        });
    }

    let body = &data[HEADER_LENGTH + CONTROL_ITEM_LENGTH..][..body_len];

    let content = if kind.is_control() {
        FrameContent::Control {
            item: ItemCode::from_raw(field),
            body,
        }
    } else {
        FrameContent::Data {
            sequence: field,
            body,
        }
    };

    Ok(Frame { kind, content })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
