// Slice descriptor: the `{data, len}` pair every string crosses the boundary in.

use std::mem;
use std::ptr;
use std::str::Utf8Error;

use bytemuck::Zeroable;

/// Error returned when a native slice cannot be turned into a `String`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("native slice of {len} bytes is not valid UTF-8: {source}")]
    InvalidUtf8 { len: usize, source: Utf8Error },
}

/// A byte buffer description shared with the native library.
///
/// The native side reads this positionally: `data` at offset 0, `len` one
/// machine word later, nothing else. `len == 0` or a null `data` is the
/// absence signal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable)]
pub struct Slice {
    pub data: *const u8,
    pub len: usize,
}

const _: () = {
    assert!(mem::size_of::<Slice>() == 2 * mem::size_of::<usize>());
    assert!(mem::align_of::<Slice>() == mem::align_of::<usize>());
    assert!(mem::offset_of!(Slice, data) == 0);
    assert!(mem::offset_of!(Slice, len) == mem::size_of::<usize>());
    assert!(mem::size_of::<*const u8>() == mem::size_of::<usize>());
};

impl Slice {
    /// The canonical absent value: null data, zero length.
    pub const ABSENT: Slice = Slice {
        data: ptr::null(),
        len: 0,
    };

    /// Whether this slice carries the absence signal.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.len == 0 || self.data.is_null()
    }

    /// Borrow the described bytes, or `None` for an absent slice.
    ///
    /// # Safety
    ///
    /// Unless the slice is absent, `data` must point to `len` readable bytes
    /// that stay valid and unmodified for `'a`.
    pub unsafe fn as_bytes<'a>(&self) -> Option<&'a [u8]> {
        if self.is_absent() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(self.data, self.len) })
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::ABSENT
    }
}

/// An input slice owned by the host for the duration of one native call.
///
/// The buffer is sized exactly to the UTF-8 length of the source text, holds
/// no terminator, and is released when this value is dropped. Keep it alive
/// until the native call that receives [`EncodedSlice::as_slice`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSlice {
    bytes: Box<[u8]>,
}

impl EncodedSlice {
    /// The descriptor to pass across the boundary.
    ///
    /// Empty input is described as [`Slice::ABSENT`] (null data).
    pub fn as_slice(&self) -> Slice {
        if self.bytes.is_empty() {
            return Slice::ABSENT;
        }
        Slice {
            data: self.bytes.as_ptr(),
            len: self.bytes.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Copy `text` into a freshly allocated buffer suitable for passing into the
/// native library.
pub fn encode(text: &str) -> EncodedSlice {
    EncodedSlice {
        bytes: Box::from(text.as_bytes()),
    }
}

/// Copy a native-owned slice into a `String`.
///
/// Returns `Ok(None)` for the absence signal. Malformed UTF-8 is rejected
/// rather than replaced. The buffer is only read, never freed.
///
/// # Safety
///
/// Same contract as [`Slice::as_bytes`]: a non-absent slice must describe
/// `len` readable bytes for the duration of this call.
pub unsafe fn decode(slice: Slice) -> Result<Option<String>, DecodeError> {
    let Some(bytes) = (unsafe { slice.as_bytes() }) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(bytes).map_err(|source| DecodeError::InvalidUtf8 {
        len: slice.len,
        source,
    })?;
    Ok(Some(text.to_owned()))
}
