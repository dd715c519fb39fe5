//! Declarative packet definitions.
//!
//! [`packet!`](crate::packet) and [`record!`](crate::record) define a plain
//! struct together with its static declaration. Each field names its wire
//! position explicitly, so the Rust field order never affects the layout.
//!
//! ```
//! use realm_codec::{packet, record, FixedStr};
//!
//! record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct ItemBonus {
//!         0 => pub bonus_id: u8,
//!         1 => pub value: u16,
//!     }
//! }
//!
//! packet! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Whisper(tag = 0x13, direction = Inbound, sequenced = true) {
//!         0 => pub target: FixedStr<25>,
//!         1 => pub bonuses: [ItemBonus; 2],
//!     }
//! }
//! ```

/// Defines a top-level message type and implements [`Packet`](crate::Packet).
///
/// `direction` is one of `Inbound`, `Outbound` or `Both`. `sequenced` is
/// optional and defaults to `false`.
#[macro_export]
macro_rules! packet {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident (
            tag = $tag:expr,
            direction = $dir:ident
            $(, sequenced = $seq:literal)?
            $(,)?
        ) {
            $(
                $(#[$fmeta:meta])*
                $pos:literal => $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::Packet for $name {
            fn declaration() -> $crate::PacketDeclaration {
                $crate::PacketDeclaration {
                    name: stringify!($name),
                    tag: $tag,
                    direction: $crate::Direction::$dir,
                    sequenced: $crate::__sequenced!($($seq)?),
                    fields: vec![
                        $(
                            $crate::FieldDeclaration::new(
                                $pos,
                                stringify!($field),
                                <$fty as $crate::WireField>::field_type(),
                            ),
                        )*
                    ],
                }
            }

            fn to_fields(&self) -> Vec<$crate::FieldValue> {
                vec![$($crate::WireField::to_value(&self.$field)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn from_fields(
                fields: Vec<$crate::FieldValue>,
            ) -> ::std::result::Result<Self, $crate::CodecError> {
                let mut fields = fields.into_iter();
                Ok(Self {
                    $(
                        $field: $crate::take_field(&mut fields, stringify!($name), $pos)?,
                    )*
                })
            }
        }
    };
}

/// Defines a nested record usable as a packet field or array element.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $pos:literal => $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::NestedRecord for $name {
            fn declaration() -> $crate::RecordDeclaration {
                $crate::RecordDeclaration {
                    name: stringify!($name),
                    fields: vec![
                        $(
                            $crate::FieldDeclaration::new(
                                $pos,
                                stringify!($field),
                                <$fty as $crate::WireField>::field_type(),
                            ),
                        )*
                    ],
                }
            }

            fn to_fields(&self) -> Vec<$crate::FieldValue> {
                vec![$($crate::WireField::to_value(&self.$field)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn from_fields(
                fields: Vec<$crate::FieldValue>,
            ) -> ::std::result::Result<Self, $crate::CodecError> {
                let mut fields = fields.into_iter();
                Ok(Self {
                    $(
                        $field: $crate::take_field(&mut fields, stringify!($name), $pos)?,
                    )*
                })
            }
        }

        impl $crate::WireField for $name {
            fn field_type() -> $crate::FieldType {
                $crate::FieldType::Record(<Self as $crate::NestedRecord>::declaration())
            }

            fn to_value(&self) -> $crate::FieldValue {
                $crate::FieldValue::Record(<Self as $crate::NestedRecord>::to_fields(self))
            }

            fn from_value(value: $crate::FieldValue) -> ::std::option::Option<Self> {
                match value {
                    $crate::FieldValue::Record(fields) => {
                        <Self as $crate::NestedRecord>::from_fields(fields).ok()
                    }
                    _ => None,
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sequenced {
    () => {
        false
    };
    ($seq:literal) => {
        $seq
    };
}
