//! Wire field values and the Rust types that map onto them.
//!
//! Every struct field declared through [`packet!`](crate::packet) or
//! [`record!`](crate::record) must implement [`WireField`]. The trait ties a
//! Rust type to its declared [`FieldType`] and converts between the typed value
//! and the dynamic [`FieldValue`] the codec walks over.
//!
//! Supported Rust types:
//!
//! | Rust type          | Field type             |
//! |--------------------|------------------------|
//! | `u8`               | `U8`                   |
//! | `u16`              | `U16`                  |
//! | `u32`              | `U32`                  |
//! | `FixedStr<N>`      | `FixedString(N)`       |
//! | `[T; N]`           | `Array(T, N)`          |
//! | `record!` types    | `Record(declaration)`  |

use crate::declaration::FieldType;
use std::fmt;
use std::ops::Deref;

/// A dynamically typed field value, ordered the way the fields were declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Str(String),
    Array(Vec<FieldValue>),
    Record(Vec<FieldValue>),
}

impl FieldValue {
    /// Short name of the value shape, used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::U8(_) => "u8",
            FieldValue::U16(_) => "u16",
            FieldValue::U32(_) => "u32",
            FieldValue::Str(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Record(_) => "record",
        }
    }
}

/// A Rust type that can appear as a field of a fixed-layout packet.
pub trait WireField: Sized {
    /// The declared wire type of this field.
    fn field_type() -> FieldType;

    /// Converts the typed value into its dynamic representation.
    fn to_value(&self) -> FieldValue;

    /// Rebuilds the typed value. Returns `None` when the value has the wrong shape.
    fn from_value(value: FieldValue) -> Option<Self>;
}

macro_rules! impl_numeric_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl WireField for $ty {
                fn field_type() -> FieldType {
                    FieldType::$variant
                }

                fn to_value(&self) -> FieldValue {
                    FieldValue::$variant(*self)
                }

                fn from_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_numeric_field! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
}

/// A text field occupying exactly `N` bytes on the wire.
///
/// Construction truncates the content to at most `N` bytes (on a character
/// boundary) and stops at the first NUL, so every `FixedStr` encodes and decodes
/// back to itself. Shorter content is NUL-padded by the codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize>(String);

impl<const N: usize> FixedStr<N> {
    /// Number of bytes this string occupies on the wire.
    pub const CAPACITY: usize = N;

    pub fn new(value: impl Into<String>) -> Self {
        Self(fit_fixed(value.into(), N))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Cuts `value` at the first NUL and to at most `capacity` bytes.
pub(crate) fn fit_fixed(mut value: String, capacity: usize) -> String {
    if let Some(nul) = value.find('\0') {
        value.truncate(nul);
    }
    if value.len() > capacity {
        let mut end = capacity;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
    }
    value
}

impl<const N: usize> Deref for FixedStr<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<String> for FixedStr<N> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> WireField for FixedStr<N> {
    fn field_type() -> FieldType {
        FieldType::FixedString(N as u32)
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Str(self.0.clone())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Str(s) => Some(Self::new(s)),
            _ => None,
        }
    }
}

impl<T: WireField, const N: usize> WireField for [T; N] {
    fn field_type() -> FieldType {
        FieldType::Array(Box::new(T::field_type()), N as u32)
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Array(self.iter().map(WireField::to_value).collect())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        let FieldValue::Array(items) = value else {
            return None;
        };
        if items.len() != N {
            return None;
        }
        let items = items
            .into_iter()
            .map(T::from_value)
            .collect::<Option<Vec<T>>>()?;
        items.try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_str_truncates_on_char_boundary() {
        // "é" is two bytes; a 3-byte window keeps "a" + "é"
        let s: FixedStr<3> = FixedStr::new("aéé");
        assert_eq!(s.as_str(), "aé");

        let s: FixedStr<2> = FixedStr::new("aé");
        assert_eq!(s.as_str(), "a");
    }

    #[test]
    fn fixed_str_stops_at_nul() {
        let s: FixedStr<16> = FixedStr::new("abc\0def");
        assert_eq!(s.as_str(), "abc");
    }

    #[test]
    fn array_rejects_wrong_length() {
        let value = FieldValue::Array(vec![FieldValue::U32(1), FieldValue::U32(2)]);
        assert!(<[u32; 3]>::from_value(value).is_none());
    }

    #[test]
    fn array_round_trips_through_value() {
        let sockets = [7u32, 8, 9];
        let back = <[u32; 3]>::from_value(sockets.to_value()).unwrap();
        assert_eq!(back, sockets);
    }

    #[test]
    fn numeric_rejects_other_shapes() {
        assert!(u16::from_value(FieldValue::U8(1)).is_none());
        assert_eq!(u16::from_value(FieldValue::U16(513)), Some(513));
    }
}
