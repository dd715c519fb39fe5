//! Schema-driven encoding and decoding.
//!
//! The codec is a set of pure functions over a [`MessageSchema`]. Numbers are
//! little-endian, fixed strings are NUL padded, and fields are laid out in
//! ascending wire position with no separators.

use crate::declaration::Packet;
use crate::error::{CodecError, Result};
use crate::field::FieldValue;
use crate::schema::{FieldDescriptor, FieldKind, MessageSchema};
use std::any::TypeId;

/// A decoded message body that has not yet been turned into a typed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Present when the schema is sequenced
    pub sequence: Option<u8>,
    /// Field values in declaration order
    pub fields: Vec<FieldValue>,
}

impl DecodedRecord {
    pub fn is<P: Packet>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }

    /// Rebuilds the typed packet this record was decoded for.
    pub fn into_packet<P: Packet>(self) -> Result<P> {
        if !self.is::<P>() {
            return Err(CodecError::TypeMismatch {
                expected: self.type_name,
                found: std::any::type_name::<P>(),
            });
        }
        P::from_fields(self.fields)
    }
}

/// Encodes `packet` with a zero sequence byte when the schema is sequenced.
pub fn encode<P: Packet>(schema: &MessageSchema, packet: &P) -> Result<Vec<u8>> {
    encode_with_sequence(schema, packet, 0)
}

/// Encodes `packet` into exactly `schema.fixed_size` bytes, tag first.
///
/// `sequence` is written only when the schema is sequenced.
pub fn encode_with_sequence<P: Packet>(schema: &MessageSchema, packet: &P, sequence: u8) -> Result<Vec<u8>> {
    if !schema.describes::<P>() {
        return Err(CodecError::TypeMismatch {
            expected: schema.type_name,
            found: std::any::type_name::<P>(),
        });
    }

    let values = packet.to_fields();
    let mut buf = Vec::with_capacity(schema.fixed_size as usize);
    buf.push(schema.tag);
    if schema.sequenced {
        buf.push(sequence);
    }
    write_fields(&mut buf, schema.type_name, &schema.fields, &values)?;

    debug_assert_eq!(buf.len(), schema.fixed_size as usize);
    Ok(buf)
}

/// Decodes a frame body (everything after the tag).
///
/// The body must be exactly `fixed_size - 1` bytes long.
pub fn decode(schema: &MessageSchema, body: &[u8]) -> Result<DecodedRecord> {
    let expected = schema.body_len();
    if body.len() != expected {
        return Err(CodecError::LengthMismatch {
            expected,
            actual: body.len(),
        });
    }

    let mut reader = Reader::new(body);
    let sequence = if schema.sequenced {
        Some(reader.u8()?)
    } else {
        None
    };
    let fields = read_fields(&mut reader, schema.type_name, &schema.fields)?;

    Ok(DecodedRecord {
        type_id: schema.type_id,
        type_name: schema.type_name,
        sequence,
        fields,
    })
}

fn write_fields(
    buf: &mut Vec<u8>,
    record: &'static str,
    descriptors: &[FieldDescriptor],
    values: &[FieldValue],
) -> Result<()> {
    if values.len() != descriptors.len() {
        return Err(CodecError::FieldMismatch {
            record,
            position: values.len().min(descriptors.len()) as u32,
        });
    }
    for descriptor in descriptors {
        write_value(buf, record, descriptor.position, &descriptor.kind, &values[descriptor.index])?;
    }
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, record: &'static str, position: u32, kind: &FieldKind, value: &FieldValue) -> Result<()> {
    match (kind, value) {
        (FieldKind::U8, FieldValue::U8(v)) => buf.push(*v),
        (FieldKind::U16, FieldValue::U16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::U32, FieldValue::U32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (FieldKind::FixedString(len), FieldValue::Str(text)) => {
            let len = *len as usize;
            let bytes = text.as_bytes();
            let written = bytes.len().min(len);
            buf.extend_from_slice(&bytes[..written]);
            buf.resize(buf.len() + (len - written), 0);
        }
        (FieldKind::Array(element, count), FieldValue::Array(items)) => {
            if items.len() != *count as usize {
                return Err(CodecError::FieldMismatch { record, position });
            }
            for item in items {
                write_value(buf, record, position, element, item)?;
            }
        }
        (FieldKind::Record(layout), FieldValue::Record(values)) => {
            write_fields(buf, layout.name, &layout.fields, values)?;
        }
        _ => return Err(CodecError::FieldMismatch { record, position }),
    }
    Ok(())
}

fn read_fields(reader: &mut Reader<'_>, record: &'static str, descriptors: &[FieldDescriptor]) -> Result<Vec<FieldValue>> {
    let mut slots: Vec<Option<FieldValue>> = vec![None; descriptors.len()];
    for descriptor in descriptors {
        slots[descriptor.index] = Some(read_value(reader, &descriptor.kind)?);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or(CodecError::FieldMismatch {
                record,
                position: index as u32,
            })
        })
        .collect()
}

fn read_value(reader: &mut Reader<'_>, kind: &FieldKind) -> Result<FieldValue> {
    Ok(match kind {
        FieldKind::U8 => FieldValue::U8(reader.u8()?),
        FieldKind::U16 => FieldValue::U16(u16::from_le_bytes(reader.array()?)),
        FieldKind::U32 => FieldValue::U32(u32::from_le_bytes(reader.array()?)),
        FieldKind::FixedString(len) => {
            let window = reader.take(*len as usize)?;
            let end = window.iter().position(|b| *b == 0).unwrap_or(window.len());
            FieldValue::Str(String::from_utf8_lossy(&window[..end]).into_owned())
        }
        FieldKind::Array(element, count) => {
            let items = (0..*count)
                .map(|_| read_value(reader, element))
                .collect::<Result<Vec<_>>>()?;
            FieldValue::Array(items)
        }
        FieldKind::Record(layout) => FieldValue::Record(read_fields(reader, layout.name, &layout.fields)?),
    })
}

/// Bounds-checked cursor over a frame body.
struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset + len;
        if end > self.buf.len() {
            return Err(CodecError::LengthMismatch {
                expected: end,
                actual: self.buf.len(),
            });
        }
        let slice = &self.buf[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
