//! Bit-packed run codec for ascending 32-bit integer sequences (PFOR style).
//!
//! A stream is a sequence of runs. Each run encodes deltas between consecutive
//! values; the decoder keeps the running sum across runs, so the concatenation of
//! all decoded runs reconstructs the original sequence.
//!
//! # Layout
//!
//! Bits are consumed most-significant first within every byte. A run starts with
//! a 2-bit header:
//!
//! | header | field | run length | payload |
//! |--------|-------|------------|---------|
//! | `00`   | 7 bits  | `[1, 32, 64, 128][field >> 5]` | one delta per value |
//! | `01`   | 13 bits | `field >> 5` (up to 255)        | one delta per value |
//! | `10`   | 13 bits | `field >> 5` (up to 255)        | a single repeated delta |
//! | `11`   | -       | end of stream                  | -                   |
//!
//! The low five bits of the field carry the bit width of each delta. A zero width
//! terminates decoding as well.
//!
//! # Bit readers
//!
//! Two readers extract `n`-bit values from the stream: a portable scalar reader and
//! an AVX2 reader that gathers four bits per step. They are interchangeable and
//! produce bit-identical output; [`decode`] picks the AVX2 reader at runtime when
//! the CPU supports it.

use corax_common::{Result, error::Error};

/// Run lengths addressable by the short (`00`) header.
pub const SHORT_RUN_LENGTHS: [usize; 4] = [1, 32, 64, 128];

/// Longest run the `01` and `10` headers can describe.
pub const MAX_RUN_LENGTH: usize = 255;

/// Widest delta a run can carry.
pub const MAX_DELTA_BITS: u32 = 31;

const HEADER_SHORT: u64 = 0b00;
const HEADER_LONG: u64 = 0b01;
const HEADER_REPEATED: u64 = 0b10;
const HEADER_END: u64 = 0b11;

const SHORT_FIELD_BITS: usize = 7;
const LONG_FIELD_BITS: usize = 13;

/// Minimum number of identical deltas the encoder emits as a repeated run.
const REPEATED_RUN_THRESHOLD: usize = 8;

/// Resumable decoding position within one encoded buffer.
///
/// Decoding can only resume at run boundaries; every successful [`decode`] call
/// consumes exactly one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PforDecoderState {
    buffer_len: usize,
    bit_pos: usize,
    prev_value: i32,
    items_decoded: usize,
}

impl PforDecoderState {
    pub fn new(buffer_len: usize) -> PforDecoderState {
        PforDecoderState {
            buffer_len,
            ..Default::default()
        }
    }

    /// Re-initializes the state for decoding a fresh buffer.
    pub fn reset(&mut self, buffer_len: usize) {
        *self = PforDecoderState::new(buffer_len);
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn max_bits(&self) -> usize {
        self.buffer_len * 8
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    pub fn items_decoded(&self) -> usize {
        self.items_decoded
    }

    pub fn previous_value(&self) -> i32 {
        self.prev_value
    }
}

/// Decodes the next run of `input` into `output`, returning the number of values
/// produced (0 at end of stream).
///
/// # Errors
///
/// * `CapacityExceeded` if the run is longer than `output`.
/// * `InvalidFormat` if the stream ends in the middle of a run.
pub fn decode(state: &mut PforDecoderState, input: &[u8], output: &mut [i32]) -> Result<usize> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx2") {
            return decode_run::<Avx2Bits>(state, input, output);
        }
    }

    decode_run::<ScalarBits>(state, input, output)
}

/// [`decode`] pinned to the scalar bit reader.
pub fn decode_scalar(
    state: &mut PforDecoderState,
    input: &[u8],
    output: &mut [i32],
) -> Result<usize> {
    decode_run::<ScalarBits>(state, input, output)
}

/// [`decode`] pinned to the vectorized bit reader.
///
/// Without AVX2 this is the scalar reader; [`decode_emulated`] runs the lane
/// algorithm on any CPU.
pub fn decode_vectorized(
    state: &mut PforDecoderState,
    input: &[u8],
    output: &mut [i32],
) -> Result<usize> {
    decode(state, input, output)
}

/// [`decode`] with the four-lane gather reader carried out on plain integers.
pub fn decode_emulated(
    state: &mut PforDecoderState,
    input: &[u8],
    output: &mut [i32],
) -> Result<usize> {
    decode_run::<EmulatedLaneBits>(state, input, output)
}

/// Decodes a complete stream into a vector.
pub fn decode_all(input: &[u8]) -> Result<Vec<i32>> {
    let mut state = PforDecoderState::new(input.len());
    let mut scratch = [0i32; MAX_RUN_LENGTH + 1];
    let mut values = Vec::new();
    loop {
        let len = decode(&mut state, input, &mut scratch)?;
        if len == 0 {
            break;
        }
        values.extend_from_slice(&scratch[..len]);
    }
    Ok(values)
}

trait BitRead {
    /// Reads `bits` bits starting at bit `pos`. The caller guarantees that the bits
    /// lie within `input`.
    fn read(input: &[u8], pos: usize, bits: usize) -> u64;
}

struct ScalarBits;

impl BitRead for ScalarBits {
    #[inline(always)]
    fn read(input: &[u8], pos: usize, bits: usize) -> u64 {
        read_bits_scalar(input, pos, bits)
    }
}

struct EmulatedLaneBits;

impl BitRead for EmulatedLaneBits {
    #[inline(always)]
    fn read(input: &[u8], pos: usize, bits: usize) -> u64 {
        read_bits_lanes(input, pos, bits)
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
struct Avx2Bits;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl BitRead for Avx2Bits {
    #[inline(always)]
    fn read(input: &[u8], pos: usize, bits: usize) -> u64 {
        // Only instantiated by `decode` after the runtime feature check.
        unsafe { read_bits_avx2(input, pos, bits) }
    }
}

#[inline(always)]
fn bit_at(input: &[u8], pos: usize) -> u64 {
    ((input[pos >> 3] >> (7 - (pos & 7))) & 1) as u64
}

#[inline]
fn read_nibble_scalar(input: &[u8], pos: usize) -> u64 {
    (bit_at(input, pos) << 3)
        | (bit_at(input, pos + 1) << 2)
        | (bit_at(input, pos + 2) << 1)
        | bit_at(input, pos + 3)
}

#[inline]
fn read_bits_scalar(input: &[u8], mut pos: usize, mut bits: usize) -> u64 {
    let mut value = 0u64;
    while bits >= 4 {
        value = (value << 4) | read_nibble_scalar(input, pos);
        pos += 4;
        bits -= 4;
    }
    for _ in 0..bits {
        value = (value << 1) | bit_at(input, pos);
        pos += 1;
    }
    value
}

/// Lane-by-lane rendition of [`read_bits_avx2`]: the same 4-byte gathers, shifts
/// and scalar tail, one lane at a time.
fn read_bits_lanes(input: &[u8], mut pos: usize, mut bits: usize) -> u64 {
    let mut value = 0u64;
    while bits >= 4 {
        let nibble = if ((pos + 3) >> 3) + 4 <= input.len() {
            let mut folded = 0u32;
            for lane in 0..4 {
                let bit = pos + lane;
                let at = bit >> 3;
                let gathered =
                    u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]);
                folded |= ((gathered >> (7 - (bit & 7))) & 1) << (3 - lane);
            }
            folded as u64
        } else {
            read_nibble_scalar(input, pos)
        };

        value = (value << 4) | nibble;
        pos += 4;
        bits -= 4;
    }

    for _ in 0..bits {
        value = (value << 1) | bit_at(input, pos);
        pos += 1;
    }
    value
}

/// AVX2 bit reader: four bits per step using a 32-bit gather at the byte offsets of
/// the four bit positions, a per-lane variable right shift to isolate each bit and
/// a variable left shift to place it within the nibble.
///
/// The gather loads four bytes from every offset, so a step whose last offset lies
/// within four bytes of the buffer end is served by the scalar nibble reader.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2")]
#[inline]
fn read_bits_avx2(input: &[u8], mut pos: usize, mut bits: usize) -> u64 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    let mut value = 0u64;
    let one = _mm_set1_epi32(1);
    let placement = _mm_set_epi32(0, 1, 2, 3);

    while bits >= 4 {
        let nibble = if ((pos + 3) >> 3) + 4 <= input.len() {
            let offsets = _mm_set_epi32(
                ((pos + 3) >> 3) as i32,
                ((pos + 2) >> 3) as i32,
                ((pos + 1) >> 3) as i32,
                (pos >> 3) as i32,
            );
            let shifts = _mm_set_epi32(
                (7 - ((pos + 3) & 7)) as i32,
                (7 - ((pos + 2) & 7)) as i32,
                (7 - ((pos + 1) & 7)) as i32,
                (7 - (pos & 7)) as i32,
            );
            // SAFETY: every lane reads 4 bytes starting at an offset that is at most
            // `input.len() - 4`, checked above.
            let gathered = unsafe { _mm_i32gather_epi32::<1>(input.as_ptr() as *const i32, offsets) };
            let lanes = _mm_sllv_epi32(_mm_and_si128(_mm_srlv_epi32(gathered, shifts), one), placement);

            let high = _mm_unpackhi_epi64(lanes, lanes);
            let folded = _mm_or_si128(lanes, high);
            let folded = _mm_or_si128(folded, _mm_shuffle_epi32::<0b01>(folded));
            _mm_cvtsi128_si32(folded) as u32 as u64
        } else {
            read_nibble_scalar(input, pos)
        };

        value = (value << 4) | nibble;
        pos += 4;
        bits -= 4;
    }

    for _ in 0..bits {
        value = (value << 1) | bit_at(input, pos);
        pos += 1;
    }
    value
}

#[inline]
fn ensure_bits(state: &PforDecoderState, pos: usize, bits: usize) -> Result<()> {
    if pos + bits > state.max_bits() {
        return Err(Error::invalid_format(
            "pfor",
            format!(
                "run at bit {pos} needs {bits} bits but the buffer holds {}",
                state.max_bits()
            ),
        ));
    }
    Ok(())
}

fn decode_run<R: BitRead>(
    state: &mut PforDecoderState,
    input: &[u8],
    output: &mut [i32],
) -> Result<usize> {
    if input.len() != state.buffer_len {
        return Err(Error::invalid_arg(
            "input",
            format!(
                "decoder initialized for {} bytes, got {}",
                state.buffer_len,
                input.len()
            ),
        ));
    }

    let mut pos = state.bit_pos;
    ensure_bits(state, pos, 2)?;
    let header = R::read(input, pos, 2);
    pos += 2;

    if header == HEADER_END {
        state.bit_pos = pos;
        return Ok(0);
    }

    let field_bits = if header == HEADER_SHORT {
        SHORT_FIELD_BITS
    } else {
        LONG_FIELD_BITS
    };
    ensure_bits(state, pos, field_bits)?;
    let field = R::read(input, pos, field_bits);
    pos += field_bits;

    let width = (field & 0x1F) as usize;
    if width == 0 {
        return Ok(0);
    }

    let count = if header == HEADER_SHORT {
        SHORT_RUN_LENGTHS[(field >> 5) as usize]
    } else {
        (field >> 5) as usize
    };

    if count > output.len() {
        return Err(Error::capacity_exceeded(
            "pfor output",
            format!("run of {count} values does not fit {} slots", output.len()),
        ));
    }

    let mut prev = state.prev_value;
    if header == HEADER_REPEATED {
        ensure_bits(state, pos, width)?;
        let delta = R::read(input, pos, width) as i32;
        pos += width;
        for slot in &mut output[..count] {
            prev = prev.wrapping_add(delta);
            *slot = prev;
        }
    } else {
        debug_assert!(header == HEADER_SHORT || header == HEADER_LONG);
        ensure_bits(state, pos, count * width)?;
        for slot in &mut output[..count] {
            let delta = R::read(input, pos, width) as i32;
            pos += width;
            prev = prev.wrapping_add(delta);
            *slot = prev;
        }
    }

    state.bit_pos = pos;
    state.prev_value = prev;
    state.items_decoded += count;
    Ok(count)
}

/// MSB-first bit sink used by [`PforEncoder`].
#[derive(Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub(crate) fn push(&mut self, value: u64, bits: usize) {
        for i in (0..bits).rev() {
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= bit << (7 - (self.bit_len % 8));
            self.bit_len += 1;
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encodes non-decreasing sequences of non-negative `i32` values into runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PforEncoder;

impl PforEncoder {
    pub fn new() -> PforEncoder {
        PforEncoder
    }

    /// Encodes `values`, terminating the stream with an end-of-stream header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the sequence decreases or starts below zero.
    pub fn encode(&self, values: &[i32]) -> Result<Vec<u8>> {
        let deltas = Self::deltas(values)?;
        let mut writer = BitWriter::default();

        let mut i = 0;
        while i < deltas.len() {
            let repeated = Self::repeated_run(&deltas[i..]);
            if repeated >= REPEATED_RUN_THRESHOLD {
                let width = Self::width(deltas[i]);
                writer.push(HEADER_REPEATED, 2);
                writer.push(((repeated as u64) << 5) | width as u64, LONG_FIELD_BITS);
                writer.push(deltas[i] as u64, width);
                i += repeated;
                continue;
            }

            let len = Self::literal_run(&deltas[i..]);
            let run = &deltas[i..i + len];
            let width = run.iter().map(|&d| Self::width(d)).max().unwrap_or(1);
            match SHORT_RUN_LENGTHS.iter().position(|&n| n == len) {
                Some(selector) => {
                    writer.push(HEADER_SHORT, 2);
                    writer.push(((selector as u64) << 5) | width as u64, SHORT_FIELD_BITS);
                }
                None => {
                    writer.push(HEADER_LONG, 2);
                    writer.push(((len as u64) << 5) | width as u64, LONG_FIELD_BITS);
                }
            }
            for &delta in run {
                writer.push(delta as u64, width);
            }
            i += len;
        }

        writer.push(HEADER_END, 2);
        Ok(writer.into_bytes())
    }

    fn deltas(values: &[i32]) -> Result<Vec<u32>> {
        let mut prev = 0i32;
        let mut deltas = Vec::with_capacity(values.len());
        for (idx, &value) in values.iter().enumerate() {
            if value < prev {
                return Err(Error::invalid_arg(
                    "values",
                    format!("value {value} at index {idx} is below its predecessor {prev}"),
                ));
            }
            deltas.push((value - prev) as u32);
            prev = value;
        }
        Ok(deltas)
    }

    fn width(delta: u32) -> usize {
        ((u32::BITS - delta.leading_zeros()).max(1)) as usize
    }

    fn repeated_run(deltas: &[u32]) -> usize {
        let first = deltas[0];
        deltas
            .iter()
            .take(MAX_RUN_LENGTH)
            .take_while(|&&d| d == first)
            .count()
    }

    /// Length of the literal run starting at `deltas[0]`: stops at 128 values or
    /// right before a sequence that qualifies as a repeated run.
    fn literal_run(deltas: &[u32]) -> usize {
        let limit = deltas.len().min(SHORT_RUN_LENGTHS[3]);
        let mut len = 1;
        while len < limit && Self::repeated_run(&deltas[len..]) < REPEATED_RUN_THRESHOLD {
            len += 1;
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream() {
        let encoded = PforEncoder::new().encode(&[]).unwrap();
        assert_eq!(encoded, vec![0b1100_0000]);
        assert!(decode_all(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_short_run_layout() {
        // header 00, selector 0 (one value), width 3, delta 5, then end marker.
        let encoded = PforEncoder::new().encode(&[5]).unwrap();
        assert_eq!(encoded, vec![0b0000_0001, 0b1101_1100]);
        let mut state = PforDecoderState::new(encoded.len());
        let mut out = [0i32; 4];
        assert_eq!(decode_scalar(&mut state, &encoded, &mut out).unwrap(), 1);
        assert_eq!(out[0], 5);
        assert_eq!(state.items_decoded(), 1);
        assert_eq!(decode_scalar(&mut state, &encoded, &mut out).unwrap(), 0);
    }

    #[test]
    fn test_repeated_run() {
        let values: Vec<i32> = (1..=100).map(|v| v * 3).collect();
        let encoded = PforEncoder::new().encode(&values).unwrap();
        // One repeated run: 2 + 13 + 2 bits, plus the end marker.
        assert_eq!(encoded.len(), 3);
        assert_eq!(decode_all(&encoded).unwrap(), values);
    }

    #[test]
    fn test_run_larger_than_output_fails() {
        let values: Vec<i32> = (0..32).map(|v| v * v).collect();
        let encoded = PforEncoder::new().encode(&values).unwrap();
        let mut state = PforDecoderState::new(encoded.len());
        let mut out = [0i32; 16];
        let err = decode(&mut state, &encoded, &mut out).unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(state.bit_position(), 0);
    }

    #[test]
    fn test_truncated_stream_is_invalid_format() {
        let values: Vec<i32> = (0..40).map(|v| v * 7 + (v % 3)).collect();
        let mut encoded = PforEncoder::new().encode(&values).unwrap();
        encoded.truncate(encoded.len() / 2);
        let err = decode_all(&encoded).unwrap_err();
        assert!(err.is_invalid_format());
    }

    #[test]
    fn test_decreasing_input_rejected() {
        assert!(PforEncoder::new().encode(&[4, 3]).is_err());
        assert!(PforEncoder::new().encode(&[-1]).is_err());
    }

    #[test]
    fn test_reset_reuses_state() {
        let a = PforEncoder::new().encode(&[1, 2, 3]).unwrap();
        let b = PforEncoder::new().encode(&[10, 20]).unwrap();
        let mut state = PforDecoderState::new(a.len());
        let mut out = [0i32; 256];
        let n = decode(&mut state, &a, &mut out).unwrap();
        assert_eq!(&out[..n], &[1, 2, 3]);

        state.reset(b.len());
        assert_eq!(state.previous_value(), 0);
        let n = decode(&mut state, &b, &mut out).unwrap();
        assert_eq!(&out[..n], &[10, 20]);
    }
}
