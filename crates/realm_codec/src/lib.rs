//! # Realm Codec
//!
//! Fixed-layout binary codec for the realm wire protocol.
//!
//! Message types are declared with [`packet!`] and [`record!`]. At startup the
//! declarations are compiled into [`MessageSchema`]s and stored in a
//! [`SchemaRegistry`], keyed by tag and direction. The [`codec`] functions then
//! encode and decode messages against those schemas.
//!
//! ## Wire format
//!
//! ```text
//! [tag: u8][sequence: u8, sequenced schemas only][fields in position order]
//! ```
//!
//! Numbers are little-endian. Fixed strings are NUL padded to their declared
//! length. Every message of a given type has the same encoded length.
//!
//! ## Example
//!
//! ```
//! use realm_codec::{codec, packet, Direction, FixedStr, SchemaRegistry};
//!
//! packet! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Chat(tag = 0x03, direction = Inbound) {
//!         0 => pub kind: u8,
//!         1 => pub text: FixedStr<16>,
//!     }
//! }
//!
//! let mut builder = SchemaRegistry::builder();
//! builder.register::<Chat>().unwrap();
//! let registry = builder.build();
//!
//! let schema = registry.lookup(0x03, Direction::Inbound).unwrap();
//! let chat = Chat { kind: 1, text: "hello".into() };
//! let bytes = codec::encode(schema, &chat).unwrap();
//! assert_eq!(bytes.len() as u32, schema.fixed_size);
//!
//! let decoded: Chat = codec::decode(schema, &bytes[1..]).unwrap().into_packet().unwrap();
//! assert_eq!(decoded, chat);
//! ```

pub mod codec;
pub mod declaration;
pub mod error;
pub mod field;
mod macros;
pub mod registry;
pub mod schema;

pub use codec::{decode, encode, encode_with_sequence, DecodedRecord};
#[doc(hidden)]
pub use declaration::take_field;
pub use declaration::{
    Direction, FieldDeclaration, FieldType, NestedRecord, Packet, PacketDeclaration, RecordDeclaration,
};
pub use error::{CodecError, SchemaBuildError};
pub use field::{FieldValue, FixedStr, WireField};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{FieldDescriptor, FieldKind, MessageSchema, RecordLayout};
