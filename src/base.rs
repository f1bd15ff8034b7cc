use crate::error::Error;
use crate::functional::*;
use std::fmt::{Debug, Display};
use std::ops::Deref;

/// A variable-length integer, RFC 8794.
///
/// Carries the decoded value plus the unknown-size flag. A VINT whose data
/// bits are all set does not encode a value, it marks an element of unknown
/// size (the element then runs to the end of the file).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VInt64 {
    /// The decoded integer value. Zero when the VINT is the unknown-size sentinel.
    pub value: u64,
    /// Whether this VInt64 represents an unknown size.
    pub is_unknown: bool,
}

impl Display for VInt64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown {
            write!(f, "unknown")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl Debug for VInt64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut t = f.debug_struct("VInt64");
        if self.is_unknown {
            t.field("value", &"Unknown");
        } else {
            t.field("value", &self.value);
        }
        t.finish()
    }
}

impl Deref for VInt64 {
    type Target = u64;
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl VInt64 {
    /// Create a VInt64 from a u64 value.
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            is_unknown: false,
        }
    }

    /// Create a VInt64 representing an unknown size.
    pub const fn new_unknown() -> Self {
        Self {
            value: 0,
            is_unknown: true,
        }
    }

    /// Size in bytes of the minimum encoding of `value`: the smallest `n`
    /// with `value <= 2^(7n) - 2`. The all-ones pattern of each width is
    /// reserved for the unknown-size sentinel and is skipped. Returns 0 when
    /// the value exceeds `2^56 - 2` and cannot be encoded at all.
    pub const fn encode_size(value: u64) -> usize {
        let total_bits = 64 - value.leading_zeros() as usize;
        let mut size = if total_bits == 0 {
            1
        } else {
            total_bits.div_ceil(7)
        };
        if size <= 8 && value == (1u64 << (7 * size)) - 1 {
            size += 1;
        }
        if size > 8 { 0 } else { size }
    }

    /// Total encoded length signalled by the first byte: 1..8, or 0 for the
    /// invalid first byte `0x00`.
    pub const fn length_from_first_byte(byte: u8) -> usize {
        if byte == 0 {
            0
        } else {
            byte.leading_zeros() as usize + 1
        }
    }

    /// Reassemble a VInt64 from a complete encoding of 1 to 8 bytes.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        let len = bytes.len();
        if len == 0 || len > 8 || Self::length_from_first_byte(bytes[0]) != len {
            return Err(Error::InvalidVInt);
        }
        let mask = if len == 8 { 0 } else { 0xFFu8 >> len };
        let mut value = u64::from(bytes[0] & mask);
        for &b in &bytes[1..] {
            value = (value << 8) | u64::from(b);
        }
        if value == (1u64 << (7 * len)) - 1 {
            Ok(Self::new_unknown())
        } else {
            Ok(Self::new(value))
        }
    }

    /// Encode with a forced width of `width` bytes instead of the minimum.
    /// Used to rewrite a size in place without shifting following bytes.
    pub fn encode_fixed<B: BufMut>(&self, width: usize, buf: &mut B) -> crate::Result<()> {
        if width == 0 || width > 8 {
            return Err(Error::InvalidVInt);
        }
        if self.is_unknown {
            let mut bytes = [0xFFu8; 8];
            bytes[0] = 0xFF >> (width - 1);
            buf.append_slice(&bytes[..width]);
            return Ok(());
        }
        if self.value > (1u64 << (7 * width)) - 2 {
            return Err(Error::VIntOverflow { width });
        }
        let mut bytes = [0u8; 8];
        bytes[8 - width..].copy_from_slice(&self.value.to_be_bytes()[8 - width..]);
        bytes[8 - width] |= 1 << (8 - width);
        buf.append_slice(&bytes[8 - width..]);
        Ok(())
    }
}

impl Decode for VInt64 {
    fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let first = u8::decode(buf)?;
        let len = Self::length_from_first_byte(first);
        if len == 0 {
            return Err(Error::InvalidVInt);
        }
        if buf.remaining() < len - 1 {
            return Err(Error::OutOfBounds);
        }
        let mut bytes = [0u8; 8];
        bytes[0] = first;
        bytes[1..len].copy_from_slice(buf.slice(len - 1));
        buf.advance(len - 1);
        Self::from_bytes(&bytes[..len])
    }
}

impl Encode for VInt64 {
    fn encode<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        if self.is_unknown {
            buf.append_slice(&[0xFF]);
            return Ok(());
        }
        let size = Self::encode_size(self.value);
        if size == 0 {
            return Err(Error::VIntOverflow { width: 8 });
        }
        let mut sbuf = [0u8; 8];
        let slice = &mut sbuf[8 - size..];
        slice.copy_from_slice(&self.value.to_be_bytes()[8 - size..]);
        slice[0] |= 1u8 << (8 - size);
        buf.append_slice(slice);
        Ok(())
    }
}

/// An EBML element ID.
///
/// IDs are VINTs whose marker bits stay part of the integer value, so the
/// EBML header element reads back as `0x1A45DFA3`. At most 4 bytes long.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.encode_size() {
            1 => write!(f, "0x{:02X}", self.0),
            2 => write!(f, "0x{:04X}", self.0),
            3 => write!(f, "0x{:06X}", self.0),
            _ => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl Debug for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ElementId({self})")
    }
}

impl ElementId {
    /// Create an element ID from its marker-retained integer form.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Encoded length in bytes, 1..4.
    pub const fn encode_size(self) -> usize {
        match self.0 {
            0..=0xFF => 1,
            0x100..=0xFFFF => 2,
            0x1_0000..=0xFF_FFFF => 3,
            _ => 4,
        }
    }

    /// Total encoded length signalled by the first byte: 1..4, or 0 when the
    /// byte cannot start an element ID.
    pub const fn length_from_first_byte(byte: u8) -> usize {
        let leading = byte.leading_zeros() as usize;
        if leading >= 4 { 0 } else { leading + 1 }
    }

    /// Reassemble an ID from raw big-endian bytes, e.g. the payload of a
    /// SeekID element. Marker bits are kept in the value.
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 4 {
            return None;
        }
        let mut raw = 0u32;
        for &b in bytes {
            raw = (raw << 8) | u32::from(b);
        }
        Some(Self(raw))
    }
}

impl Decode for ElementId {
    fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let first = u8::decode(buf)?;
        let len = Self::length_from_first_byte(first);
        if len == 0 {
            return Err(Error::InvalidVInt);
        }
        if buf.remaining() < len - 1 {
            return Err(Error::OutOfBounds);
        }
        let mut bytes = [0u8; 4];
        bytes[0] = first;
        bytes[1..len].copy_from_slice(buf.slice(len - 1));
        buf.advance(len - 1);
        Self::from_be_slice(&bytes[..len]).ok_or(Error::InvalidVInt)
    }
}

impl Encode for ElementId {
    fn encode<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        let size = self.encode_size();
        buf.append_slice(&self.0.to_be_bytes()[4 - size..]);
        Ok(())
    }
}

/// EBML element header, consisting of an ID and a size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Header {
    /// EBML ID of the element.
    pub id: ElementId,
    /// Size of the element's data, excluding the header itself.
    pub size: VInt64,
}

impl Header {
    /// Decode a header, or `None` when the buffer is exhausted. Child loops
    /// of master elements use this to detect their natural end.
    pub fn decode_opt(buf: &mut &[u8]) -> crate::Result<Option<Self>> {
        if !buf.has_remaining() {
            return Ok(None);
        }
        Ok(Some(Self::decode(buf)?))
    }
}

impl Decode for Header {
    fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let id = ElementId::decode(buf)?;
        let size = VInt64::decode(buf)?;
        Ok(Self { id, size })
    }
}

impl Encode for Header {
    fn encode<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        self.id.encode(buf)?;
        self.size.encode(buf)?;
        Ok(())
    }
}

/// IDs of elements the crate locates but never decodes.
pub mod ids {
    use super::ElementId;

    /// The Root Element that contains all other Top-Level Elements.
    pub const SEGMENT: ElementId = ElementId(0x18538067);
    /// Contains general information about the Segment.
    pub const INFO: ElementId = ElementId(0x1549A966);
    /// A Top-Level Element of information with many tracks described.
    pub const TRACKS: ElementId = ElementId(0x1654AE6B);
    /// The Top-Level Element containing the (monolithic) Block structure.
    pub const CLUSTER: ElementId = ElementId(0x1F43B675);
    /// A Top-Level Element to speed seeking access.
    pub const CUES: ElementId = ElementId(0x1C53BB6B);
    /// A system to define basic menus and partition data.
    pub const CHAPTERS: ElementId = ElementId(0x1043A770);
    /// Contains attached files.
    pub const ATTACHMENTS: ElementId = ElementId(0x1941A469);
    /// CRC-32 checksum of a master element. Skipped on read, never written.
    pub const CRC32: ElementId = ElementId(0xBF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_size() {
        let test_pair = [
            (vec![0b1000_0000], 0u64),
            (vec![0b1000_0001], 1),
            (vec![0b1111_1110], 126),
            // 127 is the 1-byte sentinel, so it takes 2 bytes
            (vec![0b0100_0000, 0x7F], 127),
            (vec![0b0100_0000, 0xFF], 0xFF),
            (vec![0b0100_0001, 0xFF], 0b1_1111_1111),
            (vec![0b0010_0000, 0b0111_1111, 0xFF], 0b111_1111_1111_1111),
            (vec![0b0010_0000, 0xFF, 0xFF], 0xFFFF),
            (vec![0b0011_1111, 0xFF, 0xFE], (1 << 21) - 2),
            (
                vec![1, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE],
                0xFF_FFFF_FFFF_FFFE,
            ),
        ];
        for (encoded, val) in test_pair {
            assert_eq!(VInt64::encode_size(val), encoded.len(), "value {val}");
        }
        // the per-width sentinel values widen by one byte
        assert_eq!(VInt64::encode_size((1 << 14) - 1), 3);
        assert_eq!(VInt64::encode_size((1 << 21) - 1), 4);
        // beyond 2^56 - 2 nothing fits
        assert_eq!(VInt64::encode_size((1 << 56) - 1), 0);
        assert_eq!(VInt64::encode_size(u64::MAX), 0);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let values = [
            0u64,
            1,
            126,
            127,
            128,
            0xFF,
            0x3FFE,
            0x3FFF,
            0x4000,
            0xFFFF,
            (1 << 21) - 2,
            (1 << 28) - 2,
            (1 << 35) - 2,
            (1 << 49) - 2,
            (1 << 56) - 2,
        ];
        for val in values {
            let mut out = vec![];
            VInt64::new(val).encode(&mut out).unwrap();
            assert_eq!(out.len(), VInt64::encode_size(val));
            let back = VInt64::decode(&mut &out[..]).unwrap();
            assert!(!back.is_unknown);
            assert_eq!(*back, val, "value {val}");
        }
    }

    #[test]
    fn test_encode_fixed() {
        for val in [0u64, 1, 127, 0x3FFE, 0xFFFF] {
            for width in VInt64::encode_size(val)..=8 {
                let mut out = vec![];
                VInt64::new(val).encode_fixed(width, &mut out).unwrap();
                assert_eq!(out.len(), width);
                let back = VInt64::decode(&mut &out[..]).unwrap();
                assert_eq!(*back, val, "value {val} width {width}");
            }
        }
        // too narrow
        let mut out = vec![];
        assert!(matches!(
            VInt64::new(127).encode_fixed(1, &mut out),
            Err(Error::VIntOverflow { width: 1 })
        ));
        assert!(matches!(
            VInt64::new(0x4000).encode_fixed(2, &mut out),
            Err(Error::VIntOverflow { width: 2 })
        ));
    }

    #[test]
    fn test_unknown_sentinel() {
        // all data bits set marks an unknown size at every width
        for encoded in [
            vec![0xFFu8],
            vec![0x7F, 0xFF],
            vec![0x3F, 0xFF, 0xFF],
            vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        ] {
            let v = VInt64::decode(&mut &encoded[..]).unwrap();
            assert!(v.is_unknown, "{encoded:02X?}");
        }

        let mut out = vec![];
        VInt64::new_unknown().encode(&mut out).unwrap();
        assert_eq!(out, vec![0xFF]);

        let mut out = vec![];
        VInt64::new_unknown().encode_fixed(3, &mut out).unwrap();
        assert_eq!(out, vec![0x3F, 0xFF, 0xFF]);

        assert_eq!(VInt64::length_from_first_byte(0x00), 0);
        for b in 1u8..=0xFF {
            let len = VInt64::length_from_first_byte(b);
            assert_eq!(len, b.leading_zeros() as usize + 1);
            assert!((1..=8).contains(&len));
        }
    }

    #[test]
    fn test_element_id() {
        let test_pair = [
            (vec![0xECu8], 0xECu32),
            (vec![0x73, 0x73], 0x7373),
            (vec![0x2A, 0xD7, 0xB1], 0x2AD7B1),
            (vec![0x1A, 0x45, 0xDF, 0xA3], 0x1A45DFA3),
            (vec![0x12, 0x54, 0xC3, 0x67], 0x1254C367),
        ];
        for (encoded, raw) in test_pair {
            let id = ElementId::decode(&mut &encoded[..]).unwrap();
            assert_eq!(id, ElementId(raw));
            assert_eq!(id.encode_size(), encoded.len());

            let mut out = vec![];
            id.encode(&mut out).unwrap();
            assert_eq!(out, encoded);
        }

        // longer than 4 bytes cannot be an ID
        assert!(matches!(
            ElementId::decode(&mut &[0x08u8, 0x00][..]),
            Err(Error::InvalidVInt)
        ));
        assert_eq!(ElementId::from_be_slice(&[0x12, 0x54, 0xC3, 0x67]), Some(ElementId(0x1254C367)));
        assert_eq!(ElementId::from_be_slice(&[]), None);
    }

    #[test]
    fn test_header() {
        let bytes = [0x12u8, 0x54, 0xC3, 0x67, 0x40, 0x80];
        let mut buf = &bytes[..];
        let header = Header::decode(&mut buf).unwrap();
        assert_eq!(header.id, ElementId(0x1254C367));
        assert_eq!(*header.size, 0x80);
        assert!(!buf.has_remaining());

        let mut out = vec![];
        header.encode(&mut out).unwrap();
        assert_eq!(out, bytes);

        assert_eq!(Header::decode_opt(&mut &[][..]).unwrap(), None);
    }
}
