use realm_codec::{packet, Direction, FixedStr, SchemaBuildError, SchemaRegistry};

packet! {
    pub struct Ping(tag = 0xFE, direction = Both) {
        0 => pub stamp: u32,
    }
}

packet! {
    pub struct Login(tag = 0x6d, direction = Inbound) {
        0 => pub username: FixedStr<31>,
        1 => pub key: u32,
        2 => pub xtea: [u32; 4],
    }
}

packet! {
    pub struct LoginClash(tag = 0x6d, direction = Inbound) {
        0 => pub key: u32,
    }
}

packet! {
    pub struct LoginReply(tag = 0x6d, direction = Outbound) {
        0 => pub status: FixedStr<9>,
    }
}

packet! {
    pub struct Gappy(tag = 0x40, direction = Inbound) {
        0 => pub a: u8,
        2 => pub b: u8,
    }
}

packet! {
    pub struct Empty(tag = 0x0a, direction = Inbound) {}
}

#[test]
fn both_direction_is_visible_from_each_side() {
    let mut builder = SchemaRegistry::builder();
    let schema = builder.register::<Ping>().unwrap();
    let registry = builder.build();

    assert_eq!(registry.len(), 2);
    let inbound = registry.lookup(0xFE, Direction::Inbound).unwrap();
    let outbound = registry.lookup(0xFE, Direction::Outbound).unwrap();
    assert!(std::sync::Arc::ptr_eq(inbound, &schema));
    assert!(std::sync::Arc::ptr_eq(outbound, &schema));
    assert!(registry.lookup(0xFE, Direction::Both).is_none());
}

#[test]
fn tag_spaces_are_independent() {
    let mut builder = SchemaRegistry::builder();
    builder.register::<Login>().unwrap();
    builder.register::<LoginReply>().unwrap();
    let registry = builder.build();

    assert_eq!(registry.lookup(0x6d, Direction::Inbound).unwrap().type_name, "Login");
    assert_eq!(registry.lookup(0x6d, Direction::Outbound).unwrap().type_name, "LoginReply");
    assert_eq!(registry.lookup(0x6d, Direction::Inbound).unwrap().fixed_size, 1 + 31 + 4 + 16);
}

#[test]
fn duplicate_tag_in_one_direction_is_fatal() {
    let mut builder = SchemaRegistry::builder();
    builder.register::<Login>().unwrap();
    let err = builder.register::<LoginClash>().unwrap_err();
    assert_eq!(
        err,
        SchemaBuildError::DuplicateTag {
            tag: 0x6d,
            direction: "inbound",
            existing: "Login",
            incoming: "LoginClash",
        }
    );

    let registry = builder.build();
    assert_eq!(registry.lookup(0x6d, Direction::Inbound).unwrap().type_name, "Login");
}

#[test]
fn registering_a_type_twice_is_fatal() {
    let mut builder = SchemaRegistry::builder();
    builder.register::<Ping>().unwrap();
    assert!(matches!(
        builder.register::<Ping>(),
        Err(SchemaBuildError::DuplicateTag { tag: 0xFE, .. })
    ));
}

#[test]
fn position_gap_is_fatal() {
    let mut builder = SchemaRegistry::builder();
    let err = builder.register::<Gappy>().unwrap_err();
    assert_eq!(
        err,
        SchemaBuildError::PositionGap {
            record: "Gappy",
            expected: 1,
            found: 2
        }
    );
    assert!(builder.build().is_empty());
}

#[test]
fn empty_packets_are_tag_only() {
    let mut builder = SchemaRegistry::builder();
    let schema = builder.register::<Empty>().unwrap();
    assert_eq!(schema.fixed_size, 1);
    assert_eq!(schema.body_len(), 0);
}
