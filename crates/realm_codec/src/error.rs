//! Error types for schema construction and packet encoding/decoding.
//!
//! Two families of errors exist and they are deliberately kept apart:
//!
//! - [`SchemaBuildError`] is raised while compiling packet declarations into
//!   layouts. It is fatal: a server must refuse to start with a broken schema.
//! - [`CodecError`] is raised per message while encoding or decoding. It only
//!   ever concerns the connection the message belongs to.

use thiserror::Error;

/// Failure while compiling a packet or record declaration into a layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaBuildError {
    /// Two fields of the same type claim the same wire position
    #[error("{record}: duplicate field position {position}")]
    DuplicatePosition { record: &'static str, position: u32 },

    /// Field positions must be dense, starting at zero
    #[error("{record}: field positions must be dense from 0, expected {expected} but found {found}")]
    PositionGap {
        record: &'static str,
        expected: u32,
        found: u32,
    },

    /// The field type cannot be laid out with a fixed size
    #[error("{record}: field '{field}' has unsupported kind: {reason}")]
    UnsupportedKind {
        record: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    /// Another schema already owns this tag in the same direction
    #[error("tag 0x{tag:02x} ({direction}) is registered by both {existing} and {incoming}")]
    DuplicateTag {
        tag: u8,
        direction: &'static str,
        existing: &'static str,
        incoming: &'static str,
    },

    /// The same Rust type was registered twice for one direction
    #[error("{record} is already registered for {direction}")]
    DuplicateType {
        record: &'static str,
        direction: &'static str,
    },

    /// The computed frame size does not fit in a u32
    #[error("{record}: layout exceeds the maximum frame size")]
    TooLarge { record: &'static str },
}

/// Failure while encoding or decoding a single message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record handed to the codec is not the type the schema describes
    #[error("type mismatch: schema describes {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The byte buffer does not have the exact size the schema requires
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A field value does not have the shape its descriptor declares
    #[error("{record}: value at field position {position} does not match its declared kind")]
    FieldMismatch { record: &'static str, position: u32 },
}

/// Convenience alias for codec results.
pub type Result<T> = std::result::Result<T, CodecError>;
