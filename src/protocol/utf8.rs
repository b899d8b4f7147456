//! UTF-8 sizing, encoding and decoding
//!
//! Text-socket peers hand text around as UTF-16 code units, so the routines
//! here classify by code point after folding surrogate pairs. That keeps the
//! byte count used to size a text payload identical on both sides of a
//! connection, including for lone surrogates which are sized and written as
//! three-byte sequences.

use super::{Error, Result};

const SURROGATE_HIGH: u16 = 0xD800;
const SURROGATE_LOW: u16 = 0xDC00;
const SURROGATE_END: u16 = 0xE000;
const SUPPLEMENTARY: u32 = 0x1_0000;

const CONTINUATION: u8 = 0b1000_0000;
const CONTINUATION_BITS: u32 = 0b0011_1111;

/// Folds UTF-16 code units into code points.
struct CodePoints<I: Iterator<Item = u16>> {
    units: std::iter::Peekable<I>,
}

impl<I: Iterator<Item = u16>> CodePoints<I> {
    fn new(units: I) -> Self {
        Self {
            units: units.peekable(),
        }
    }
}

impl<I: Iterator<Item = u16>> Iterator for CodePoints<I> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let unit = self.units.next()?;
        if (SURROGATE_HIGH..SURROGATE_LOW).contains(&unit) {
            if let Some(&low) = self.units.peek() {
                if (SURROGATE_LOW..SURROGATE_END).contains(&low) {
                    self.units.next();
                    let high = u32::from(unit - SURROGATE_HIGH) << 10;
                    return Some(high + u32::from(low - SURROGATE_LOW) + SUPPLEMENTARY);
                }
            }
        }
        Some(u32::from(unit))
    }
}

/// Bytes needed to encode one code point.
const fn width(point: u32) -> usize {
    if point < 0x80 {
        1
    } else if point < 0x800 {
        2
    } else if point < 0x1_0000 {
        3
    } else {
        4
    }
}

fn write_point(point: u32, dest: &mut [u8]) -> usize {
    let continuation = |shift: u32| CONTINUATION | ((point >> shift) & CONTINUATION_BITS) as u8;
    match width(point) {
        1 => {
            dest[0] = point as u8;
            1
        }
        2 => {
            dest[0] = 0b1100_0000 | (point >> 6) as u8;
            dest[1] = continuation(0);
            2
        }
        3 => {
            dest[0] = 0b1110_0000 | (point >> 12) as u8;
            dest[1] = continuation(6);
            dest[2] = continuation(0);
            3
        }
        _ => {
            dest[0] = 0b1111_0000 | (point >> 18) as u8;
            dest[1] = continuation(12);
            dest[2] = continuation(6);
            dest[3] = continuation(0);
            4
        }
    }
}

fn length_of(units: impl Iterator<Item = u16>) -> usize {
    CodePoints::new(units).map(width).sum()
}

fn encode_units(
    units: impl Iterator<Item = u16> + Clone,
    dest: &mut [u8],
    offset: usize,
) -> Result<usize> {
    let needed = offset + length_of(units.clone());
    if dest.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            got: dest.len(),
        });
    }

    let mut cursor = offset;
    for point in CodePoints::new(units) {
        cursor += write_point(point, &mut dest[cursor..]);
    }
    Ok(cursor - offset)
}

/// Number of bytes `text` occupies once encoded
#[must_use]
pub fn byte_length(text: &str) -> usize {
    length_of(text.encode_utf16())
}

/// Number of bytes a UTF-16 code-unit sequence occupies once encoded
#[must_use]
pub fn byte_length_utf16(units: &[u16]) -> usize {
    length_of(units.iter().copied())
}

/// Encode `text` into `dest` starting at `offset`
///
/// Returns the number of bytes written, always equal to [`byte_length`].
pub fn encode(text: &str, dest: &mut [u8], offset: usize) -> Result<usize> {
    encode_units(text.encode_utf16(), dest, offset)
}

/// Encode UTF-16 code units into `dest` starting at `offset`
pub fn encode_utf16(units: &[u16], dest: &mut [u8], offset: usize) -> Result<usize> {
    encode_units(units.iter().copied(), dest, offset)
}

/// Encode `text` into a fresh buffer with `prefix` zeroed bytes in front
#[must_use]
pub fn encode_to_vec(text: &str, prefix: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; prefix + byte_length(text)];
    let mut cursor = prefix;
    for point in CodePoints::new(text.encode_utf16()) {
        cursor += write_point(point, &mut buffer[cursor..]);
    }
    buffer
}

/// Read one code point at `at`, returning it with its encoded width.
fn read_point(bytes: &[u8], at: usize) -> Result<(u32, usize)> {
    let lead = bytes[at];
    let (width, mut point) = if lead >> 7 == 0 {
        (1, u32::from(lead))
    } else if lead >> 5 == 0b110 {
        (2, u32::from(lead & 0b1_1111))
    } else if lead >> 4 == 0b1110 {
        (3, u32::from(lead & 0b1111))
    } else if lead >> 3 == 0b1_1110 {
        (4, u32::from(lead & 0b111))
    } else {
        return Err(Error::MalformedUtf8 { offset: at });
    };

    if at + width > bytes.len() {
        return Err(Error::MalformedUtf8 { offset: at });
    }
    for &byte in &bytes[at + 1..at + width] {
        if byte & 0b1100_0000 != CONTINUATION {
            return Err(Error::MalformedUtf8 { offset: at });
        }
        point = (point << 6) | (u32::from(byte) & CONTINUATION_BITS);
    }
    Ok((point, width))
}

fn check_offset(bytes: &[u8], offset: usize) -> Result<()> {
    if offset > bytes.len() {
        return Err(Error::BufferTooSmall {
            needed: offset,
            got: bytes.len(),
        });
    }
    Ok(())
}

/// Decode `bytes` from `offset` to the end into UTF-16 code units
///
/// Code points above the basic plane come back as surrogate pairs.
pub fn decode_utf16(bytes: &[u8], offset: usize) -> Result<Vec<u16>> {
    check_offset(bytes, offset)?;
    let mut units = Vec::with_capacity(bytes.len() - offset);
    let mut at = offset;
    while at < bytes.len() {
        let (point, width) = read_point(bytes, at)?;
        if point >= SUPPLEMENTARY {
            let point = point - SUPPLEMENTARY;
            units.push(SURROGATE_HIGH + (point >> 10) as u16);
            units.push(SURROGATE_LOW + (point & 0x3FF) as u16);
        } else {
            units.push(point as u16);
        }
        at += width;
    }
    Ok(units)
}

/// Decode `bytes` from `offset` to the end into a string
pub fn decode(bytes: &[u8], offset: usize) -> Result<String> {
    check_offset(bytes, offset)?;
    let mut text = String::with_capacity(bytes.len() - offset);
    let mut at = offset;
    while at < bytes.len() {
        let (point, width) = read_point(bytes, at)?;
        let ch = char::from_u32(point).ok_or(Error::MalformedUtf8 { offset: at })?;
        text.push(ch);
        at += width;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_incremental_samples() {
        let mut text = String::new();
        for sample in ["a", "\u{00FF}", "\u{4E2D}", "\u{1F602}"] {
            text.push_str(sample);
            let encoded = encode_to_vec(&text, 0);
            assert_eq!(byte_length(&text), encoded.len(), "length: {text}");
            assert_eq!(encoded, text.as_bytes(), "encoding: {text}");
            assert_eq!(decode(&encoded, 0).unwrap(), text, "decoding: {text}");
        }
        assert_eq!(byte_length(&text), 1 + 2 + 3 + 4);
    }

    #[test]
    fn test_encode_at_offset() {
        let mut buffer = [0xAAu8; 8];
        let written = encode("\u{00FF}z", &mut buffer, 3).unwrap();
        assert_eq!(written, 3);
        assert_eq!(&buffer[..6], &[0xAA, 0xAA, 0xAA, 0xC3, 0xBF, b'z']);
        assert_eq!(decode(&buffer[..6], 3).unwrap(), "\u{00FF}z");
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buffer = [0u8; 3];
        let result = encode("\u{1F602}", &mut buffer, 0);
        assert_eq!(result, Err(Error::BufferTooSmall { needed: 4, got: 3 }));
    }

    #[test]
    fn test_prefix_reserved() {
        let encoded = encode_to_vec("hi", 2);
        assert_eq!(encoded, vec![0, 0, b'h', b'i']);
    }

    #[test]
    fn test_surrogate_pair_split() {
        let units = decode_utf16("\u{1F602}".as_bytes(), 0).unwrap();
        assert_eq!(units, vec![0xD83D, 0xDE02]);
        assert_eq!(byte_length_utf16(&units), 4);

        let mut buffer = [0u8; 4];
        encode_utf16(&units, &mut buffer, 0).unwrap();
        assert_eq!(&buffer, "\u{1F602}".as_bytes());
    }

    #[test]
    fn test_lone_surrogate_is_three_bytes() {
        assert_eq!(byte_length_utf16(&[0xD800]), 3);
        assert_eq!(byte_length_utf16(&[0xD800, 0x0041]), 4);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(decode(&[0x80], 0), Err(Error::MalformedUtf8 { offset: 0 }));
        assert_eq!(
            decode(&[b'a', 0xE4, 0xB8], 0),
            Err(Error::MalformedUtf8 { offset: 1 })
        );
        assert_eq!(
            decode(&[0xC3, 0x41], 0),
            Err(Error::MalformedUtf8 { offset: 0 })
        );
        assert!(matches!(
            decode(b"ab", 3),
            Err(Error::BufferTooSmall { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_length_matches_std(text in any::<String>()) {
            prop_assert_eq!(byte_length(&text), text.len());
            prop_assert_eq!(encode_to_vec(&text, 0), text.as_bytes().to_vec());
        }

        #[test]
        fn prop_decode_inverts_encode(text in any::<String>()) {
            let encoded = encode_to_vec(&text, 0);
            prop_assert_eq!(decode(&encoded, 0).unwrap(), text.clone());
            let units: Vec<u16> = text.encode_utf16().collect();
            prop_assert_eq!(decode_utf16(&encoded, 0).unwrap(), units);
        }
    }
}
