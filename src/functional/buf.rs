/// A contiguous buffer of bytes.
pub trait Buf: std::fmt::Debug {
    /// Bytes left to consume.
    fn remaining(&self) -> usize;
    /// The next `size` bytes, without consuming them.
    fn slice(&self, size: usize) -> &[u8];
    /// Consume `n` bytes.
    fn advance(&mut self, n: usize);
    /// Whether any bytes are left.
    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }
}

impl Buf for &[u8] {
    fn remaining(&self) -> usize {
        self.len()
    }

    fn slice(&self, size: usize) -> &[u8] {
        &self[..size]
    }

    fn advance(&mut self, n: usize) {
        *self = &self[n..];
    }
}

/// A mutable contiguous buffer of bytes.
pub trait BufMut: std::fmt::Debug {
    /// Bytes written so far.
    fn len(&self) -> usize;
    /// Whether nothing has been written.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Append `val` at the end.
    fn append_slice(&mut self, val: &[u8]);
}

impl BufMut for Vec<u8> {
    fn len(&self) -> usize {
        self.len()
    }

    fn append_slice(&mut self, val: &[u8]) {
        self.extend_from_slice(val);
    }
}

impl<T: BufMut + ?Sized> BufMut for &mut T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn append_slice(&mut self, val: &[u8]) {
        (**self).append_slice(val)
    }
}
