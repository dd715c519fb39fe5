//! Static packet and record declarations.
//!
//! A declaration is what a message type says about itself: its name, tag,
//! direction, whether it carries a sequence byte, and its fields with their
//! wire positions. Declarations are produced by the [`packet!`](crate::packet)
//! and [`record!`](crate::record) macros and compiled into layouts by the
//! [`SchemaRegistry`](crate::SchemaRegistry) at startup.

use crate::error::CodecError;
use crate::field::{FieldValue, WireField};
use std::fmt;

/// Which side of the connection sends a message.
///
/// Inbound and outbound tags live in separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server
    Inbound,
    /// Server to client
    Outbound,
    /// Registered in both namespaces under the same tag
    Both,
}

impl Direction {
    /// Whether a schema declared with `self` is reachable when looking up `other`.
    pub fn includes(self, other: Direction) -> bool {
        self == Direction::Both || self == other
    }

    /// The concrete directions a declaration is registered under.
    pub fn concrete(self) -> &'static [Direction] {
        match self {
            Direction::Inbound => &[Direction::Inbound],
            Direction::Outbound => &[Direction::Outbound],
            Direction::Both => &[Direction::Inbound, Direction::Outbound],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared type of a field, before layout validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    /// Text padded or truncated to exactly this many bytes
    FixedString(u32),
    /// `count` consecutive elements of the inner type
    Array(Box<FieldType>, u32),
    /// An embedded record with its own positioned fields
    Record(RecordDeclaration),
}

/// One declared field of a packet or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub position: u32,
    pub name: &'static str,
    pub field_type: FieldType,
}

impl FieldDeclaration {
    pub fn new(position: u32, name: &'static str, field_type: FieldType) -> Self {
        Self {
            position,
            name,
            field_type,
        }
    }
}

/// Declaration of a nested record type (no tag, no direction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDeclaration {
    pub name: &'static str,
    pub fields: Vec<FieldDeclaration>,
}

/// Declaration of a top-level message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDeclaration {
    pub name: &'static str,
    pub tag: u8,
    pub direction: Direction,
    pub sequenced: bool,
    pub fields: Vec<FieldDeclaration>,
}

/// A message type with a fixed wire layout.
///
/// `to_fields` and `from_fields` work on values in declaration order; the
/// compiled schema maps them onto wire positions.
pub trait Packet: Send + Sync + Sized + 'static {
    fn declaration() -> PacketDeclaration;

    fn to_fields(&self) -> Vec<FieldValue>;

    fn from_fields(fields: Vec<FieldValue>) -> Result<Self, CodecError>;
}

/// A record embedded inside packets, either directly or in arrays.
pub trait NestedRecord: Sized {
    fn declaration() -> RecordDeclaration;

    fn to_fields(&self) -> Vec<FieldValue>;

    fn from_fields(fields: Vec<FieldValue>) -> Result<Self, CodecError>;
}

/// Pulls the next declared field out of a value list and converts it.
#[doc(hidden)]
pub fn take_field<T, I>(fields: &mut I, record: &'static str, position: u32) -> Result<T, CodecError>
where
    T: WireField,
    I: Iterator<Item = FieldValue>,
{
    fields
        .next()
        .and_then(T::from_value)
        .ok_or(CodecError::FieldMismatch { record, position })
}
