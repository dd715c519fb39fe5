//! Inbound framing.
//!
//! Frames carry no length prefix: the tag selects an inbound schema and the
//! schema's fixed size says how many bytes the frame occupies.

use crate::error::ServerError;
use bytes::BytesMut;
use realm_codec::{codec, DecodedRecord, Direction, MessageSchema, SchemaRegistry};
use std::sync::Arc;
use tokio_util::codec::Decoder;

/// A complete, decoded inbound frame.
#[derive(Debug)]
pub struct InboundFrame {
    pub schema: Arc<MessageSchema>,
    pub record: DecodedRecord,
}

/// Splits an inbound byte stream into frames using the schema registry.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    registry: Arc<SchemaRegistry>,
}

impl FrameDecoder {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }
}

impl Decoder for FrameDecoder {
    type Item = InboundFrame;
    type Error = ServerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&tag) = src.first() else {
            return Ok(None);
        };
        let schema = self
            .registry
            .lookup(tag, Direction::Inbound)
            .ok_or(ServerError::UnknownMessage { tag })?;

        let size = schema.fixed_size as usize;
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        let frame = src.split_to(size);
        let record = codec::decode(schema, &frame[1..])?;
        Ok(Some(InboundFrame {
            schema: schema.clone(),
            record,
        }))
    }
}
