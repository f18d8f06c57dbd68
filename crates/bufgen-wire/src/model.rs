//! The per-type codec contract and its implementations for built-in shapes.
//!
//! Generated code implements [`BuffersModel`] for every schema struct and enum;
//! the impls below cover primitives, strings, optionals, collections and the
//! ordered associative container, so generated impls only ever delegate.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::reader::BytesReader;
use crate::writer::BytesWriter;

/// Canonical default, decode, skip and encode for one wire type.
pub trait BuffersModel: Sized {
    /// Deterministic schema-declared "zero" instance.
    fn create_buffers_default() -> Self;

    /// Consume exactly one encoded instance.
    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self>;

    /// Advance past `count` encoded instances without materializing them.
    ///
    /// Must leave the cursor exactly where `count` calls to
    /// [`read_from_buffers`](BuffersModel::read_from_buffers) would.
    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()>;

    /// Append this value's encoding.
    fn write_to_buffers(&self, writer: &mut BytesWriter);
}

macro_rules! fixed_width_model {
    ($ty:ty, $width:expr, $zero:expr, $read:ident, $write:ident) => {
        impl BuffersModel for $ty {
            fn create_buffers_default() -> Self {
                $zero
            }

            fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
                reader.$read()
            }

            fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
                reader.skip_fixed($width, count)
            }

            fn write_to_buffers(&self, writer: &mut BytesWriter) {
                writer.$write(*self);
            }
        }
    };
}

fixed_width_model!(u8, 1, 0, read_u8, write_u8);
fixed_width_model!(i32, 4, 0, read_i32, write_i32);
fixed_width_model!(u32, 4, 0, read_u32, write_u32);
fixed_width_model!(i64, 8, 0, read_i64, write_i64);
fixed_width_model!(u64, 8, 0, read_u64, write_u64);
fixed_width_model!(f32, 4, 0.0, read_f32, write_f32);
fixed_width_model!(f64, 8, 0.0, read_f64, write_f64);
fixed_width_model!(bool, 1, false, read_bool, write_bool);

impl BuffersModel for String {
    fn create_buffers_default() -> Self {
        String::new()
    }

    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
        reader.read_string()
    }

    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        for _ in 0..count {
            reader.skip_bytes()?;
        }
        Ok(())
    }

    fn write_to_buffers(&self, writer: &mut BytesWriter) {
        writer.write_string(self);
    }
}

/// Methods without a result and pushes without payload encode nothing.
impl BuffersModel for () {
    fn create_buffers_default() -> Self {}

    fn read_from_buffers(_: &mut BytesReader<'_>) -> Result<Self> {
        Ok(())
    }

    fn skip_in_buffers(_: &mut BytesReader<'_>, _: u64) -> Result<()> {
        Ok(())
    }

    fn write_to_buffers(&self, _: &mut BytesWriter) {}
}

/// Tuples encode like anonymous structs: elements in order, no framing.
macro_rules! tuple_model {
    ($($name:ident),+) => {
        impl<$($name: BuffersModel),+> BuffersModel for ($($name,)+) {
            fn create_buffers_default() -> Self {
                ($($name::create_buffers_default(),)+)
            }

            fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
                Ok(($($name::read_from_buffers(reader)?,)+))
            }

            fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
                for _ in 0..count {
                    $($name::skip_in_buffers(reader, 1)?;)+
                }
                Ok(())
            }

            #[allow(non_snake_case)]
            fn write_to_buffers(&self, writer: &mut BytesWriter) {
                let ($($name,)+) = self;
                $($name.write_to_buffers(writer);)+
            }
        }
    };
}

tuple_model!(A);
tuple_model!(A, B);
tuple_model!(A, B, C);
tuple_model!(A, B, C, D);

impl<T: BuffersModel> BuffersModel for Option<T> {
    fn create_buffers_default() -> Self {
        None
    }

    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
        if reader.read_bool()? {
            Ok(Some(T::read_from_buffers(reader)?))
        } else {
            Ok(None)
        }
    }

    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        for _ in 0..count {
            if reader.read_bool()? {
                T::skip_in_buffers(reader, 1)?;
            }
        }
        Ok(())
    }

    fn write_to_buffers(&self, writer: &mut BytesWriter) {
        writer.write_presence(self.is_some());
        if let Some(value) = self {
            value.write_to_buffers(writer);
        }
    }
}

/// Boxing is a Rust layout concern only; the encoding is the inner value's.
impl<T: BuffersModel> BuffersModel for Box<T> {
    fn create_buffers_default() -> Self {
        Box::new(T::create_buffers_default())
    }

    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
        T::read_from_buffers(reader).map(Box::new)
    }

    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        T::skip_in_buffers(reader, count)
    }

    fn write_to_buffers(&self, writer: &mut BytesWriter) {
        (**self).write_to_buffers(writer);
    }
}

impl<T: BuffersModel> BuffersModel for Vec<T> {
    fn create_buffers_default() -> Self {
        Vec::new()
    }

    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
        let len = reader.read_len()?;
        // Cap the preallocation; a lying prefix still fails on the first short read.
        let mut items = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            items.push(T::read_from_buffers(reader)?);
        }
        Ok(items)
    }

    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        for _ in 0..count {
            let len = reader.read_len()?;
            T::skip_in_buffers(reader, len as u64)?;
        }
        Ok(())
    }

    fn write_to_buffers(&self, writer: &mut BytesWriter) {
        writer.write_len(self.len());
        for item in self {
            item.write_to_buffers(writer);
        }
    }
}

/// Ordered key/value container: count prefix, then pairs in key order.
impl<K, V> BuffersModel for BTreeMap<K, V>
where
    K: BuffersModel + Ord,
    V: BuffersModel,
{
    fn create_buffers_default() -> Self {
        BTreeMap::new()
    }

    fn read_from_buffers(reader: &mut BytesReader<'_>) -> Result<Self> {
        let len = reader.read_len()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::read_from_buffers(reader)?;
            let value = V::read_from_buffers(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn skip_in_buffers(reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        for _ in 0..count {
            let len = reader.read_len()?;
            for _ in 0..len {
                K::skip_in_buffers(reader, 1)?;
                V::skip_in_buffers(reader, 1)?;
            }
        }
        Ok(())
    }

    fn write_to_buffers(&self, writer: &mut BytesWriter) {
        writer.write_len(self.len());
        for (key, value) in self {
            key.write_to_buffers(writer);
            value.write_to_buffers(writer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_model, encode_model};
    use crate::error::WireError;

    #[test]
    fn three_strings_skip_as_one_collection() {
        let items = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let wire = encode_model(&items);
        assert_eq!(wire.len(), 8 + (8 + 1) + (8 + 2) + (8 + 3));

        let mut reader = BytesReader::new(&wire);
        Vec::<String>::skip_in_buffers(&mut reader, 1).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn optional_presence_byte() {
        assert_eq!(encode_model(&None::<u32>).as_ref(), &[0x00]);
        assert_eq!(
            encode_model(&Some(7u32)).as_ref(),
            &[0x01, 0x07, 0x00, 0x00, 0x00]
        );
        let value: Option<u32> = decode_model(&[0x01, 0x07, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(value, Some(7));
    }

    #[test]
    fn map_encodes_pairs_in_key_order() {
        let mut table = BTreeMap::new();
        table.insert(2u8, "two".to_string());
        table.insert(1u8, "one".to_string());

        let wire = encode_model(&table);
        assert_eq!(&wire[..8], &2u64.to_le_bytes());
        assert_eq!(wire[8], 1);

        let decoded: BTreeMap<u8, String> = decode_model(&wire).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn defaults_are_zero_values() {
        assert_eq!(i64::create_buffers_default(), 0);
        assert_eq!(f64::create_buffers_default().to_bits(), 0.0f64.to_bits());
        assert!(!bool::create_buffers_default());
        assert!(String::create_buffers_default().is_empty());
        assert!(Vec::<u8>::create_buffers_default().is_empty());
        assert_eq!(Option::<String>::create_buffers_default(), None);
    }

    #[test]
    fn nested_collection_skip() {
        let nested = vec![vec![Some(1i32), None], vec![], vec![Some(3)]];
        let mut writer = BytesWriter::new();
        nested.write_to_buffers(&mut writer);
        writer.write_u8(0xAB);
        let wire = writer.freeze();

        let mut reader = BytesReader::new(&wire);
        Vec::<Vec<Option<i32>>>::skip_in_buffers(&mut reader, 1).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
    }

    #[test]
    fn truncated_collection_fails() {
        let mut wire = encode_model(&vec![1u32, 2, 3]).to_vec();
        wire.truncate(wire.len() - 1);

        assert!(matches!(
            decode_model::<Vec<u32>>(&wire),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn tuples_concatenate_elements() {
        let wire = encode_model(&(7u8, true, "x".to_string()));
        assert_eq!(wire.len(), 1 + 1 + 8 + 1);

        let mut reader = BytesReader::new(&wire);
        <(u8, bool, String)>::skip_in_buffers(&mut reader, 1).unwrap();
        assert!(reader.is_empty());
        assert_eq!(
            decode_model::<(u8, bool, String)>(&wire).unwrap(),
            (7, true, "x".to_string())
        );
    }

    #[test]
    fn unit_encodes_nothing() {
        assert!(encode_model(&()).is_empty());
        let mut reader = BytesReader::new(&[]);
        <()>::read_from_buffers(&mut reader).unwrap();
    }
}
