//! The schema registry.
//!
//! Schemas are registered once at startup through a [`SchemaRegistryBuilder`]
//! and then frozen into a [`SchemaRegistry`], which only offers lookups. The
//! frozen registry is meant to be shared as `Arc<SchemaRegistry>`.

use crate::declaration::{Direction, Packet};
use crate::error::SchemaBuildError;
use crate::schema::MessageSchema;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Collects message schemas before the server starts.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    by_tag: HashMap<(u8, Direction), Arc<MessageSchema>>,
    by_type: HashMap<(TypeId, Direction), Arc<MessageSchema>>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers the schema of `P`.
    ///
    /// A `Both` declaration is registered in the inbound and outbound tag
    /// spaces. Nothing is inserted when any of its slots is already taken.
    pub fn register<P: Packet>(&mut self) -> Result<Arc<MessageSchema>, SchemaBuildError> {
        let schema = Arc::new(MessageSchema::compile::<P>()?);
        let directions = schema.direction.concrete();

        for direction in directions {
            if let Some(existing) = self.by_tag.get(&(schema.tag, *direction)) {
                return Err(SchemaBuildError::DuplicateTag {
                    tag: schema.tag,
                    direction: direction.as_str(),
                    existing: existing.type_name,
                    incoming: schema.type_name,
                });
            }
            if self.by_type.contains_key(&(schema.type_id, *direction)) {
                return Err(SchemaBuildError::DuplicateType {
                    record: schema.type_name,
                    direction: direction.as_str(),
                });
            }
        }

        for direction in directions {
            self.by_tag.insert((schema.tag, *direction), schema.clone());
            self.by_type.insert((schema.type_id, *direction), schema.clone());
        }

        debug!(
            "📐 Registered {} (tag 0x{:02x}, {}, {} bytes)",
            schema.type_name, schema.tag, schema.direction, schema.fixed_size
        );
        Ok(schema)
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            by_tag: self.by_tag,
            by_type: self.by_type,
        }
    }
}

/// Read-only (tag, direction) and (type, direction) index of message schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    by_tag: HashMap<(u8, Direction), Arc<MessageSchema>>,
    by_type: HashMap<(TypeId, Direction), Arc<MessageSchema>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    /// Finds the schema for a tag. `direction` is `Inbound` or `Outbound`;
    /// `Both` never matches since every schema is stored under concrete
    /// directions.
    pub fn lookup(&self, tag: u8, direction: Direction) -> Option<&Arc<MessageSchema>> {
        self.by_tag.get(&(tag, direction))
    }

    /// Finds the schema of a typed packet.
    pub fn schema_for<P: Packet>(&self, direction: Direction) -> Option<&Arc<MessageSchema>> {
        self.by_type.get(&(TypeId::of::<P>(), direction))
    }

    /// Number of (tag, direction) slots in use.
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// All schemas registered for one direction.
    pub fn schemas(&self, direction: Direction) -> impl Iterator<Item = &Arc<MessageSchema>> {
        self.by_tag
            .iter()
            .filter(move |((_, d), _)| *d == direction)
            .map(|(_, schema)| schema)
    }
}
