use crate::base::*;
use crate::error::Error;
use crate::functional::*;

/// A Matroska element that can be decoded from and encoded to memory.
pub trait Element: Sized {
    /// The element's EBML ID.
    const ID: ElementId;
    /// Whether the element carries a default value used when it is absent.
    const HAS_DEFAULT_VALUE: bool = false;
    /// Decode the element body. The buffer holds exactly the body bytes.
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self>;
    /// Encode the element body, without the ID and size header.
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()>;
}

impl<T: Element> Decode for T {
    fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let header = Header::decode(buf)?;
        if header.size.is_unknown {
            return Err(Error::ElementBodySizeUnknown(header.id));
        }
        let body_size = *header.size as usize;
        if buf.remaining() < body_size {
            return Err(Error::OutOfBounds);
        }
        let mut body = buf.slice(body_size);
        let element = match T::decode_body(&mut body) {
            Ok(e) => e,
            Err(Error::OutOfBounds) => return Err(Error::OverDecode(Self::ID)),
            Err(e) => return Err(e),
        };

        if body.has_remaining() {
            return Err(Error::UnderDecode(Self::ID));
        }

        buf.advance(body_size);
        Ok(element)
    }
}

impl<T: Element> Encode for T {
    fn encode<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        let mut body_buf = Vec::new();
        self.encode_body(&mut body_buf)?;
        let header = Header {
            id: T::ID,
            size: VInt64::new(body_buf.len() as u64),
        };
        header.encode(buf)?;
        buf.append_slice(&body_buf);
        Ok(())
    }
}
