//! Encoded JPEG bytes handed to callers.

/// An owned, exactly sized JPEG byte buffer.
///
/// A buffer can be released explicitly. Releasing is idempotent, and a
/// released buffer reports itself as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    data: Option<Box<[u8]>>,
}

impl OutputBuffer {
    /// Take ownership of encoded bytes. An empty vector yields an empty buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self {
            data: Some(bytes.into_boxed_slice()),
        }
    }

    /// A buffer with no contents, used for failed tiles.
    pub fn empty() -> Self {
        Self { data: None }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Free the bytes now. Safe to call any number of times.
    pub fn release(&mut self) {
        self.data = None;
    }

    /// Copy of the bytes as a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Hand the allocation to a foreign caller.
    ///
    /// Returns a null pointer and zero length for an empty buffer. The pair
    /// must be returned through [`OutputBuffer::from_raw_parts`] to be freed.
    pub fn into_raw_parts(self) -> (*mut u8, usize) {
        match self.data {
            Some(bytes) => {
                let len = bytes.len();
                (Box::into_raw(bytes).cast::<u8>(), len)
            }
            None => (std::ptr::null_mut(), 0),
        }
    }

    /// Reclaim an allocation produced by [`OutputBuffer::into_raw_parts`].
    ///
    /// # Safety
    ///
    /// `data` and `len` must come from one `into_raw_parts` call and must not
    /// have been reclaimed before. A null `data` yields an empty buffer.
    pub unsafe fn from_raw_parts(data: *mut u8, len: usize) -> Self {
        if data.is_null() {
            return Self::empty();
        }
        let slice = std::ptr::slice_from_raw_parts_mut(data, len);
        Self {
            data: Some(Box::from_raw(slice)),
        }
    }
}

impl From<Vec<u8>> for OutputBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for OutputBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
