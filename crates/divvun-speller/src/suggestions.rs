// Suggestion vector accessor.
//
// A `*_suggest` call returns an opaque slice naming a native collection.
// It is read only through the length and indexed-element entry points, and
// released (when the library allows it) once every element is decoded.

use std::ffi::c_long;

use divvun_abi::surface::{VEC_SUGGESTION_GET_VALUE, VEC_SUGGESTION_LEN, VecFns};
use divvun_abi::{Slice, channel, decode};

use crate::error::{Error, Result};

pub(crate) struct SuggestionVec<'a> {
    fns: &'a VecFns,
    raw: Slice,
}

impl<'a> SuggestionVec<'a> {
    /// Take ownership of a vector returned by a successful suggest call.
    pub(crate) fn new(fns: &'a VecFns, raw: Slice) -> Self {
        Self { fns, raw }
    }

    pub(crate) fn len(&self) -> Result<usize> {
        let len = channel::call(VEC_SUGGESTION_LEN, |error| unsafe {
            (self.fns.len)(self.raw, error)
        })?;
        usize::try_from(len).map_err(|_| {
            Error::ProtocolViolation(format!("{VEC_SUGGESTION_LEN} returned negative length {len}"))
        })
    }

    /// Decode element `index`. Holes are not allowed.
    pub(crate) fn get(&self, index: usize) -> Result<String> {
        let native_index = c_long::try_from(index).map_err(|_| {
            Error::ProtocolViolation(format!("suggestion index {index} does not fit a C long"))
        })?;
        let element = channel::call(VEC_SUGGESTION_GET_VALUE, |error| unsafe {
            (self.fns.get_value)(self.raw, native_index, error)
        })?;
        // The element borrows from the vector, which is alive until `self`
        // drops.
        match unsafe { decode(element) }? {
            Some(text) => Ok(text),
            None => Err(Error::ProtocolViolation(format!(
                "suggestion {index} is absent"
            ))),
        }
    }

    /// Every element, in native order.
    pub(crate) fn to_vec(&self) -> Result<Vec<String>> {
        let len = self.len()?;
        (0..len).map(|i| self.get(i)).collect()
    }
}

impl Drop for SuggestionVec<'_> {
    fn drop(&mut self) {
        if self.raw.data.is_null() {
            return;
        }
        if let Some(free) = self.fns.free {
            unsafe { free(self.raw) };
        }
    }
}
