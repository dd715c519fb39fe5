//! Property tests for the fixed-layout codec.
//!
//! These exercise the codec through the public API with a packet shaped like a
//! real item update: scalars, a fixed string, a scalar array and an array of
//! nested records.

use proptest::prelude::*;
use realm_codec::{codec, packet, record, CodecError, Direction, FixedStr, SchemaRegistry};

record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Bonus {
        0 => pub bonus_id: u8,
        1 => pub value: u16,
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct ItemUpdate(tag = 0x15, direction = Outbound) {
        0 => pub window: u8,
        1 => pub position: u16,
        2 => pub item_id: u32,
        3 => pub owner: FixedStr<12>,
        4 => pub sockets: [u32; 3],
        5 => pub bonuses: [Bonus; 7],
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Step(tag = 0x07, direction = Inbound, sequenced = true) {
        0 => pub x: u32,
        1 => pub y: u32,
    }
}

fn registry() -> SchemaRegistry {
    let mut builder = SchemaRegistry::builder();
    builder.register::<ItemUpdate>().unwrap();
    builder.register::<Step>().unwrap();
    builder.build()
}

fn bonus() -> impl Strategy<Value = Bonus> {
    (any::<u8>(), any::<u16>()).prop_map(|(bonus_id, value)| Bonus { bonus_id, value })
}

fn item_update() -> impl Strategy<Value = ItemUpdate> {
    (
        any::<u8>(),
        any::<u16>(),
        any::<u32>(),
        "[a-zA-Z0-9 ]{0,12}",
        any::<[u32; 3]>(),
        prop::array::uniform7(bonus()),
    )
        .prop_map(|(window, position, item_id, owner, sockets, bonuses)| ItemUpdate {
            window,
            position,
            item_id,
            owner: FixedStr::new(owner),
            sockets,
            bonuses,
        })
}

#[test]
fn item_update_layout_size() {
    let registry = registry();
    let schema = registry.lookup(0x15, Direction::Outbound).unwrap();
    // tag + u8 + u16 + u32 + 12 + 3 * 4 + 7 * 3
    assert_eq!(schema.fixed_size, 1 + 1 + 2 + 4 + 12 + 12 + 21);
    assert!(registry.lookup(0x15, Direction::Inbound).is_none());
}

#[test]
fn string_filling_the_window_decodes_in_full() {
    let registry = registry();
    let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();
    let item = ItemUpdate {
        window: 1,
        position: 2,
        item_id: 3,
        owner: FixedStr::new("abcdefghijkl"),
        sockets: [0; 3],
        bonuses: std::array::from_fn(|_| Bonus { bonus_id: 0, value: 0 }),
    };

    let bytes = codec::encode(schema, &item).unwrap();
    assert_eq!(&bytes[8..20], b"abcdefghijkl");

    let back: ItemUpdate = codec::decode(schema, &bytes[1..]).unwrap().into_packet().unwrap();
    assert_eq!(back.owner.as_str(), "abcdefghijkl");
}

#[test]
fn short_string_is_nul_padded() {
    let registry = registry();
    let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();
    let item = ItemUpdate {
        window: 0,
        position: 0,
        item_id: 0,
        owner: FixedStr::new("bob"),
        sockets: [0; 3],
        bonuses: std::array::from_fn(|_| Bonus { bonus_id: 0, value: 0 }),
    };

    let bytes = codec::encode(schema, &item).unwrap();
    assert_eq!(&bytes[8..20], b"bob\0\0\0\0\0\0\0\0\0");
}

#[test]
fn text_after_first_nul_is_ignored() {
    let registry = registry();
    let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();
    let mut body = vec![0u8; schema.body_len()];
    body[7..14].copy_from_slice(b"ann\0xyz");

    let back: ItemUpdate = codec::decode(schema, &body).unwrap().into_packet().unwrap();
    assert_eq!(back.owner.as_str(), "ann");
}

proptest! {
    #[test]
    fn item_update_round_trips(item in item_update()) {
        let registry = registry();
        let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();

        let bytes = codec::encode(schema, &item).unwrap();
        prop_assert_eq!(bytes.len(), schema.fixed_size as usize);
        prop_assert_eq!(bytes[0], 0x15);

        let back: ItemUpdate = codec::decode(schema, &bytes[1..]).unwrap().into_packet().unwrap();
        prop_assert_eq!(back, item);
    }

    #[test]
    fn sequence_byte_survives(x in any::<u32>(), y in any::<u32>(), sequence in any::<u8>()) {
        let registry = registry();
        let schema = registry.lookup(0x07, Direction::Inbound).unwrap();

        let bytes = codec::encode_with_sequence(schema, &Step { x, y }, sequence).unwrap();
        prop_assert_eq!(bytes.len(), 10);

        let record = codec::decode(schema, &bytes[1..]).unwrap();
        prop_assert_eq!(record.sequence, Some(sequence));
        prop_assert_eq!(record.into_packet::<Step>().unwrap(), Step { x, y });
    }

    #[test]
    fn wrong_body_length_is_rejected(body in prop::collection::vec(any::<u8>(), 0..200)) {
        let registry = registry();
        let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();
        prop_assume!(body.len() != schema.body_len());

        let err = codec::decode(schema, &body).unwrap_err();
        prop_assert_eq!(err, CodecError::LengthMismatch { expected: schema.body_len(), actual: body.len() });
    }

    #[test]
    fn any_body_of_the_right_length_decodes(seed in prop::collection::vec(any::<u8>(), 52)) {
        let registry = registry();
        let schema = registry.schema_for::<ItemUpdate>(Direction::Outbound).unwrap();
        prop_assert_eq!(seed.len(), schema.body_len());

        let record = codec::decode(schema, &seed);
        prop_assert!(record.is_ok());
        prop_assert!(record.unwrap().into_packet::<ItemUpdate>().is_ok());
    }
}
