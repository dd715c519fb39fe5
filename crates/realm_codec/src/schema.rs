//! Compiled layouts.
//!
//! [`MessageSchema`] is the validated form of a [`PacketDeclaration`]: fields
//! sorted by wire position, every field's byte length resolved, and the total
//! frame size computed once. Schemas are immutable after compilation and are
//! shared through `Arc`.

use crate::declaration::{Direction, FieldDeclaration, FieldType, Packet, RecordDeclaration};
use crate::error::SchemaBuildError;
use std::any::TypeId;
use std::sync::Arc;

/// Resolved field kind with nested layouts already compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    FixedString(u32),
    Array(Box<FieldKind>, u32),
    Record(Arc<RecordLayout>),
}

impl FieldKind {
    /// Encoded size of one value of this kind.
    pub fn byte_length(&self) -> u32 {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 => 4,
            FieldKind::FixedString(len) => *len,
            // Overflow is ruled out when the layout is compiled
            FieldKind::Array(element, count) => element.byte_length() * count,
            FieldKind::Record(layout) => layout.byte_length,
        }
    }
}

/// A single field of a compiled layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Wire position, dense from zero
    pub position: u32,
    pub name: &'static str,
    pub kind: FieldKind,
    pub byte_length: u32,
    /// Index of this field in declaration order, which is the order of the
    /// values produced by `to_fields`
    pub(crate) index: usize,
}

/// Compiled layout of a nested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub byte_length: u32,
}

impl RecordLayout {
    pub fn compile(declaration: &RecordDeclaration) -> Result<Self, SchemaBuildError> {
        if declaration.fields.is_empty() {
            return Err(SchemaBuildError::UnsupportedKind {
                record: declaration.name,
                field: declaration.name,
                reason: "nested records must declare at least one field",
            });
        }
        let (fields, byte_length) = compile_fields(declaration.name, &declaration.fields)?;
        Ok(Self {
            name: declaration.name,
            fields,
            byte_length,
        })
    }
}

/// The compiled description of one message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    pub tag: u8,
    pub direction: Direction,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub sequenced: bool,
    /// Fields in ascending wire position
    pub fields: Vec<FieldDescriptor>,
    /// Full encoded length: tag, optional sequence byte and all fields
    pub fixed_size: u32,
}

impl MessageSchema {
    /// Compiles the declaration of `P`.
    pub fn compile<P: Packet>() -> Result<Self, SchemaBuildError> {
        let declaration = P::declaration();
        let (fields, body) = compile_fields(declaration.name, &declaration.fields)?;

        let header = 1 + u32::from(declaration.sequenced);
        let fixed_size = body
            .checked_add(header)
            .ok_or(SchemaBuildError::TooLarge {
                record: declaration.name,
            })?;

        Ok(Self {
            tag: declaration.tag,
            direction: declaration.direction,
            type_id: TypeId::of::<P>(),
            type_name: declaration.name,
            sequenced: declaration.sequenced,
            fields,
            fixed_size,
        })
    }

    /// Bytes that follow the tag on the wire.
    pub fn body_len(&self) -> usize {
        self.fixed_size as usize - 1
    }

    pub fn describes<P: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }
}

/// Sorts, validates and sizes a list of field declarations.
fn compile_fields(
    record: &'static str,
    declarations: &[FieldDeclaration],
) -> Result<(Vec<FieldDescriptor>, u32), SchemaBuildError> {
    let mut order: Vec<(usize, &FieldDeclaration)> = declarations.iter().enumerate().collect();
    order.sort_by_key(|(_, field)| field.position);

    let mut fields = Vec::with_capacity(order.len());
    let mut total: u32 = 0;

    for (expected, (index, declaration)) in order.into_iter().enumerate() {
        let expected = expected as u32;
        if declaration.position < expected {
            return Err(SchemaBuildError::DuplicatePosition {
                record,
                position: declaration.position,
            });
        }
        if declaration.position > expected {
            return Err(SchemaBuildError::PositionGap {
                record,
                expected,
                found: declaration.position,
            });
        }

        let kind = compile_kind(record, declaration.name, &declaration.field_type)?;
        let byte_length = checked_length(record, &kind)?;
        total = total
            .checked_add(byte_length)
            .ok_or(SchemaBuildError::TooLarge { record })?;

        fields.push(FieldDescriptor {
            position: declaration.position,
            name: declaration.name,
            kind,
            byte_length,
            index,
        });
    }

    Ok((fields, total))
}

fn compile_kind(
    record: &'static str,
    field: &'static str,
    field_type: &FieldType,
) -> Result<FieldKind, SchemaBuildError> {
    let unsupported = |reason| SchemaBuildError::UnsupportedKind {
        record,
        field,
        reason,
    };

    match field_type {
        FieldType::U8 => Ok(FieldKind::U8),
        FieldType::U16 => Ok(FieldKind::U16),
        FieldType::U32 => Ok(FieldKind::U32),
        FieldType::FixedString(0) => Err(unsupported("fixed strings need a length of at least 1")),
        FieldType::FixedString(len) => Ok(FieldKind::FixedString(*len)),
        FieldType::Array(_, 0) => Err(unsupported("arrays need a count of at least 1")),
        FieldType::Array(element, _) if matches!(**element, FieldType::Array(..)) => {
            Err(unsupported("arrays of arrays are not supported"))
        }
        FieldType::Array(element, count) => {
            let element = compile_kind(record, field, element)?;
            Ok(FieldKind::Array(Box::new(element), *count))
        }
        FieldType::Record(declaration) => {
            Ok(FieldKind::Record(Arc::new(RecordLayout::compile(declaration)?)))
        }
    }
}

fn checked_length(record: &'static str, kind: &FieldKind) -> Result<u32, SchemaBuildError> {
    match kind {
        FieldKind::Array(element, count) => checked_length(record, element)?
            .checked_mul(*count)
            .ok_or(SchemaBuildError::TooLarge { record }),
        other => Ok(other.byte_length()),
    }
}
