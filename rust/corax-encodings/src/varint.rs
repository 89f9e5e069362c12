//! Variable-size integer encoding.
//!
//! Values are written as little-endian base-128 groups, seven payload bits per byte,
//! with the high bit of each byte set when another byte follows. Signed integers
//! are zig-zag mapped first so that values close to zero (of either sign) stay
//! short: `0 → 0, -1 → 1, 1 → 2, -2 → 3, ...`.
//!
//! Writers assume the caller sized the destination (see [`size_of`]); writing past
//! the end of the buffer is a programming error and panics. Readers operate on
//! persisted bytes and report truncated or overlong encodings as
//! [`corax_common::error::ErrorKind::InvalidFormat`].

use corax_common::{Result, error::Error};

/// An integer type that can be stored with the variable-size encoding.
pub trait VarInt: Copy + Sized {
    /// Upper bound of the encoded length in bytes.
    const MAX_LEN: usize;

    /// Maps the value onto the unsigned wire representation (zig-zag for signed types).
    fn to_wire(self) -> u64;

    /// Inverse of [`VarInt::to_wire`]. Returns `None` if the wire value does not fit
    /// the target width.
    fn from_wire(wire: u64) -> Option<Self>;
}

macro_rules! impl_unsigned_varint {
    ($($t:ty),*) => {
        $(
            impl VarInt for $t {
                const MAX_LEN: usize = (<$t>::BITS as usize).div_ceil(7);

                #[inline]
                fn to_wire(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_wire(wire: u64) -> Option<Self> {
                    <$t>::try_from(wire).ok()
                }
            }
        )*
    };
}

macro_rules! impl_signed_varint {
    ($($t:ty => $u:ty),*) => {
        $(
            impl VarInt for $t {
                const MAX_LEN: usize = (<$t>::BITS as usize).div_ceil(7);

                #[inline]
                fn to_wire(self) -> u64 {
                    ((self << 1) ^ (self >> (<$t>::BITS - 1))) as $u as u64
                }

                #[inline]
                fn from_wire(wire: u64) -> Option<Self> {
                    let unsigned = <$u>::try_from(wire).ok()?;
                    Some(((unsigned >> 1) as $t) ^ -((unsigned & 1) as $t))
                }
            }
        )*
    };
}

impl_unsigned_varint!(u8, u16, u32, u64, usize);
impl_signed_varint!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, isize => usize);

/// Returns the number of bytes `value` occupies once encoded.
#[inline]
pub fn size_of<T: VarInt>(value: T) -> usize {
    let wire = value.to_wire();
    let significant = (u64::BITS - wire.leading_zeros()).max(1) as usize;
    significant.div_ceil(7)
}

/// Writes `value` at `offset` and returns the number of bytes written.
///
/// # Panics
///
/// Panics if `buffer` is too small to hold the encoded value at `offset`.
#[inline]
pub fn write<T: VarInt>(buffer: &mut [u8], value: T, offset: usize) -> usize {
    let mut wire = value.to_wire();
    let mut pos = offset;
    while wire >= 0x80 {
        buffer[pos] = (wire as u8) | 0x80;
        wire >>= 7;
        pos += 1;
    }
    buffer[pos] = wire as u8;
    pos + 1 - offset
}

/// Writes all `values` consecutively starting at `offset`; returns the total length.
pub fn write_many<T: VarInt>(buffer: &mut [u8], values: &[T], offset: usize) -> usize {
    let mut pos = offset;
    for &value in values {
        pos += write(buffer, value, pos);
    }
    pos - offset
}

/// Appends the encoding of `value` to `target`.
pub fn push<T: VarInt>(target: &mut Vec<u8>, value: T) -> usize {
    let mut scratch = [0u8; 10];
    let len = write(&mut scratch, value, 0);
    target.extend_from_slice(&scratch[..len]);
    len
}

/// Reads a value at `offset`, returning it together with the number of bytes consumed.
#[inline]
pub fn read<T: VarInt>(buffer: &[u8], offset: usize) -> Result<(T, usize)> {
    let mut wire = 0u64;
    let mut shift = 0u32;
    let mut pos = offset;
    loop {
        let Some(&byte) = buffer.get(pos) else {
            return Err(Error::invalid_format(
                "varint",
                format!("truncated value at offset {offset}"),
            ));
        };
        pos += 1;
        if pos - offset > T::MAX_LEN {
            return Err(Error::invalid_format(
                "varint",
                format!("value at offset {offset} exceeds {} bytes", T::MAX_LEN),
            ));
        }
        wire |= ((byte & 0x7F) as u64).checked_shl(shift).unwrap_or(0);
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let value = T::from_wire(wire).ok_or_else(|| {
        Error::invalid_format(
            "varint",
            format!("value {wire} at offset {offset} overflows the target width"),
        )
    })?;
    Ok((value, pos - offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: VarInt + PartialEq + std::fmt::Debug>(value: T) {
        let mut buffer = [0u8; 16];
        let written = write(&mut buffer, value, 3);
        assert_eq!(written, size_of(value));
        let (decoded, read_len) = read::<T>(&buffer, 3).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(read_len, written);
    }

    #[test]
    fn test_round_trip_extremes() {
        for v in [0i64, 1, -1, 63, -64, 64, -65, i64::MIN, i64::MAX] {
            round_trip(v);
        }
        for v in [0u64, 127, 128, 16_383, 16_384, u64::MAX] {
            round_trip(v);
        }
        for v in [i32::MIN, i32::MAX, 0, -300] {
            round_trip(v);
        }
        for v in [u8::MAX, 0u8, 0x7F] {
            round_trip(v);
        }
        for v in [i8::MIN, i8::MAX] {
            round_trip(v);
        }
        round_trip(u16::MAX);
        round_trip(i16::MIN);
    }

    #[test]
    fn test_random_i64_round_trip() {
        fastrand::seed(0x5eed_1234);
        for _ in 0..10_000 {
            round_trip(fastrand::i64(..));
            round_trip(fastrand::u64(..) >> fastrand::u32(0..64));
        }
    }

    #[test]
    fn test_zigzag_layout() {
        assert_eq!(0i64.to_wire(), 0);
        assert_eq!((-1i64).to_wire(), 1);
        assert_eq!(1i64.to_wire(), 2);
        assert_eq!((-2i64).to_wire(), 3);
        assert_eq!(i64::MIN.to_wire(), u64::MAX);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(size_of(0u32), 1);
        assert_eq!(size_of(127u32), 1);
        assert_eq!(size_of(128u32), 2);
        assert_eq!(size_of(u64::MAX), 10);
        assert_eq!(size_of(-64i64), 1);
        assert_eq!(size_of(-65i64), 2);
    }

    #[test]
    fn test_write_many() {
        let values = [1u32, 300, 70_000];
        let mut buffer = vec![0u8; 16];
        let len = write_many(&mut buffer, &values, 0);
        assert_eq!(len, 1 + 2 + 3);
        let mut offset = 0;
        for expected in values {
            let (v, l) = read::<u32>(&buffer, offset).unwrap();
            assert_eq!(v, expected);
            offset += l;
        }
    }

    #[test]
    fn test_truncated_value_is_invalid_format() {
        let err = read::<u32>(&[0x80, 0x80], 0).unwrap_err();
        assert!(err.is_invalid_format());
    }

    #[test]
    fn test_overlong_value_is_invalid_format() {
        let err = read::<u8>(&[0x80, 0x80, 0x01], 0).unwrap_err();
        assert!(err.is_invalid_format());
        let err = read::<u8>(&[0x80, 0x02], 0).unwrap_err();
        assert!(err.is_invalid_format());
    }

    #[test]
    #[should_panic]
    fn test_write_into_undersized_buffer_panics() {
        let mut buffer = [0u8; 1];
        write(&mut buffer, 300u32, 0);
    }
}
