//! A dynamic byte buffer, the payload type delivered to `OnReceive`.
//!
//! The distilled specification treats this type as an external collaborator
//! ("assumed: owns a growable byte array with Data/Size/Capacity/Assign/
//! Append"). It is specified in full here because the core cannot be a
//! complete, shippable crate without it.

use bytes::{Bytes, BytesMut};

/// An owned, growable byte array.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DynBuffer {
    inner: BytesMut,
}

impl DynBuffer {
    pub fn new() -> DynBuffer {
        DynBuffer {
            inner: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> DynBuffer {
        DynBuffer {
            inner: BytesMut::with_capacity(capacity),
        }
    }

    /// The underlying bytes.
    pub fn data(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Replace the contents of this buffer with `data`.
    pub fn assign(&mut self, data: &[u8]) {
        self.inner.clear();
        self.inner.extend_from_slice(data);
    }

    /// Grow the buffer and extend it with `data`.
    pub fn append(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Reserve additional capacity without growing `len`.
    pub fn reserve(&mut self, additional: usize) {
        self.inner.reserve(additional);
    }

    /// Split off an immutable, cheaply clonable view of the current
    /// contents, leaving this buffer empty. Used when handing a freshly
    /// read chunk to the callback pipeline without copying it again.
    pub fn split_to_bytes(&mut self) -> Bytes {
        self.inner.split().freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.inner.to_vec()
    }
}

impl From<Vec<u8>> for DynBuffer {
    fn from(v: Vec<u8>) -> DynBuffer {
        DynBuffer {
            inner: BytesMut::from(&v[..]),
        }
    }
}

impl From<&[u8]> for DynBuffer {
    fn from(v: &[u8]) -> DynBuffer {
        DynBuffer {
            inner: BytesMut::from(v),
        }
    }
}

impl AsRef<[u8]> for DynBuffer {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

impl std::fmt::Debug for DynBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynBuffer").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_replaces_prior_contents() {
        let mut buf = DynBuffer::new();
        buf.append(b"stale");
        buf.assign(b"fresh");
        assert_eq!(buf.data(), b"fresh");
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn append_grows_instead_of_replacing() {
        let mut buf = DynBuffer::new();
        buf.append(b"foo");
        buf.append(b"bar");
        assert_eq!(buf.data(), b"foobar");
    }

    #[test]
    fn split_to_bytes_empties_the_buffer() {
        let mut buf = DynBuffer::new();
        buf.append(b"payload");
        let taken = buf.split_to_bytes();
        assert_eq!(&taken[..], b"payload");
        assert!(buf.is_empty());
    }

    #[test]
    fn with_capacity_reserves_without_growing_len() {
        let buf = DynBuffer::with_capacity(64);
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= 64);
    }
}
