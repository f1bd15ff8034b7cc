use crate::base::{ElementId, VInt64};
use crate::error::Error;
use crate::stream::{BufStream, Medium};

/// A framed element header read from a stream: the ID, the declared size and
/// the absolute offsets derived from them. The content itself stays on the
/// stream until one of the typed readers pulls it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElementFrame {
    /// EBML ID of the element, marker bits retained.
    pub id: ElementId,
    /// Content size in bytes. Zero when the size is unknown.
    pub size: u64,
    /// Whether the size VINT was the unknown-size sentinel.
    pub size_unknown: bool,
    /// Absolute offset of the first header byte.
    pub header_offset: u64,
    /// Absolute offset of the first content byte.
    pub data_offset: u64,
    /// Absolute offset one past the content. For an unknown size this is the
    /// end of the file.
    pub end_offset: u64,
    /// Encoded width of the ID, 1..4.
    pub id_len: u8,
    /// Encoded width of the size VINT, 1..8.
    pub size_len: u8,
}

impl ElementFrame {
    /// Read an element header at the current stream position, leaving the
    /// position at the first content byte.
    pub fn read<S: Medium>(stream: &mut BufStream<S>) -> crate::Result<Self> {
        let header_offset = stream.position();

        let first = stream.read_byte()?;
        let id_len = ElementId::length_from_first_byte(first);
        if id_len == 0 {
            return Err(Error::InvalidVInt);
        }
        let mut id_bytes = [0u8; 4];
        id_bytes[0] = first;
        stream.read_exact(&mut id_bytes[1..id_len])?;
        let id = ElementId::from_be_slice(&id_bytes[..id_len]).ok_or(Error::InvalidVInt)?;

        let first = stream.read_byte()?;
        let size_len = VInt64::length_from_first_byte(first);
        if size_len == 0 {
            return Err(Error::InvalidVInt);
        }
        let mut size_bytes = [0u8; 8];
        size_bytes[0] = first;
        stream.read_exact(&mut size_bytes[1..size_len])?;
        let size = VInt64::from_bytes(&size_bytes[..size_len])?;

        let data_offset = stream.position();
        let end_offset = if size.is_unknown {
            stream.size()
        } else {
            let end = data_offset + *size;
            if end > stream.size() {
                return Err(Error::Truncated);
            }
            end
        };

        Ok(Self {
            id,
            size: *size,
            size_unknown: size.is_unknown,
            header_offset,
            data_offset,
            end_offset,
            id_len: id_len as u8,
            size_len: size_len as u8,
        })
    }

    /// Read an element header without moving the stream position.
    pub fn peek<S: Medium>(stream: &mut BufStream<S>) -> crate::Result<Self> {
        let pos = stream.position();
        let frame = Self::read(stream);
        stream.seek_to(pos);
        frame
    }

    /// Width of the encoded header, ID plus size VINT.
    pub fn header_size(&self) -> u64 {
        u64::from(self.id_len) + u64::from(self.size_len)
    }

    /// Total encoded span of the element, header included.
    pub fn total_size(&self) -> u64 {
        self.end_offset - self.header_offset
    }

    /// Whether the stream position has reached the end of this element.
    pub fn at_end<S: Medium>(&self, stream: &BufStream<S>) -> bool {
        stream.position() >= self.end_offset
    }

    /// Seek past the content. Refused for an unknown size, which has no
    /// framed end.
    pub fn skip<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<()> {
        if self.size_unknown {
            return Err(Error::ElementBodySizeUnknown(self.id));
        }
        stream.seek_to(self.end_offset);
        Ok(())
    }

    /// Read the whole content into memory.
    pub fn read_binary<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<Vec<u8>> {
        if self.size_unknown {
            return Err(Error::ElementBodySizeUnknown(self.id));
        }
        stream.seek_to(self.data_offset);
        let mut body = vec![0; self.size as usize];
        stream.read_exact(&mut body)?;
        Ok(body)
    }

    /// Read the content as a big-endian unsigned integer of up to 8 bytes.
    /// An empty content decodes to 0.
    pub fn read_uint<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<u64> {
        if self.size_unknown || self.size > 8 {
            return Err(Error::Corrupt("unsigned integer wider than 8 bytes"));
        }
        stream.seek_to(self.data_offset);
        let len = self.size as usize;
        let mut bytes = [0u8; 8];
        stream.read_exact(&mut bytes[8 - len..])?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Read the content as a sign-extended big-endian integer of up to 8
    /// bytes. An empty content decodes to 0.
    pub fn read_int<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<i64> {
        if self.size_unknown || self.size > 8 {
            return Err(Error::Corrupt("signed integer wider than 8 bytes"));
        }
        if self.size == 0 {
            return Ok(0);
        }
        stream.seek_to(self.data_offset);
        let len = self.size as usize;
        let mut bytes = [0u8; 8];
        stream.read_exact(&mut bytes[..len])?;
        Ok(i64::from_be_bytes(bytes) >> (8 * (8 - len as u32)))
    }

    /// Read the content as an IEEE-754 float: 4 or 8 bytes, or empty for 0.
    pub fn read_float<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<f64> {
        if self.size_unknown {
            return Err(Error::ElementBodySizeUnknown(self.id));
        }
        stream.seek_to(self.data_offset);
        match self.size {
            0 => Ok(0.0),
            4 => {
                let mut bytes = [0u8; 4];
                stream.read_exact(&mut bytes)?;
                Ok(f64::from(f32::from_be_bytes(bytes)))
            }
            8 => {
                let mut bytes = [0u8; 8];
                stream.read_exact(&mut bytes)?;
                Ok(f64::from_be_bytes(bytes))
            }
            _ => Err(Error::Corrupt("float must be 0, 4 or 8 bytes")),
        }
    }

    /// Read the content as a UTF-8 string, trimming EBML zero padding at the
    /// tail.
    pub fn read_string<S: Medium>(&self, stream: &mut BufStream<S>) -> crate::Result<String> {
        let mut bytes = self.read_binary(stream)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8(bytes)?)
    }
}
