use crate::base::{ElementId, VInt64};
use crate::element::Element;
use crate::error::Error;
use crate::functional::*;

/// Ebml Void element, used for padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Void {
    /// Size of the void body in bytes, excluding the header.
    pub size: u64,
}

impl Element for Void {
    const ID: ElementId = ElementId(0xEC);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let len = buf.remaining() as u64;
        buf.advance(buf.remaining());
        Ok(Self { size: len })
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        buf.append_slice(&vec![0; self.size as usize]);
        Ok(())
    }
}

impl Void {
    /// Split a total span, header included, into a size-VINT width and a
    /// body length with `1 + width + body == total`. A given body length
    /// admits several VINT widths, so the width is grown until the split
    /// lands on an encodable combination. `None` below the 2-byte minimum.
    pub fn span_layout(total: u64) -> Option<(usize, u64)> {
        for width in 1..=8u64 {
            if total < 1 + width {
                break;
            }
            let body = total - 1 - width;
            if VInt64::encode_size(body) as u64 <= width {
                return Some((width as usize, body));
            }
        }
        None
    }

    /// Encode a Void whose total span, header included, is exactly `total`
    /// bytes. The minimum representable span is 2 bytes.
    pub fn encode_exact<B: BufMut>(total: u64, buf: &mut B) -> crate::Result<()> {
        let (width, body) =
            Self::span_layout(total).ok_or(Error::Corrupt("void span below the 2-byte minimum"))?;
        Self::ID.encode(buf)?;
        VInt64::new(body).encode_fixed(width, buf)?;
        buf.append_slice(&vec![0; body as usize]);
        Ok(())
    }
}
