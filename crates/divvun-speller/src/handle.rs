// Raw native handle and its owner.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use divvun_abi::surface::ReleaseFn;

/// A non-null opaque pointer produced by the native library.
#[derive(Debug)]
pub(crate) struct RawHandle(NonNull<c_void>);

// The pointer is only an identifier on this side; every use goes through the
// `Mutex` in `OwnedHandle`, which serializes access across threads.
unsafe impl Send for RawHandle {}

impl RawHandle {
    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// An archive or speller handle that is released exactly once.
///
/// Every native call using the handle holds its lock. When the library
/// exports no release function the handle is left to the native side.
#[derive(Debug)]
pub(crate) struct OwnedHandle {
    handle: Mutex<RawHandle>,
    release: Option<ReleaseFn>,
    what: &'static str,
}

impl OwnedHandle {
    /// Wrap a handle returned by the native library; `None` when null.
    pub(crate) fn new(ptr: *mut c_void, release: Option<ReleaseFn>, what: &'static str) -> Option<Self> {
        let handle = RawHandle(NonNull::new(ptr)?);
        Some(Self {
            handle: Mutex::new(handle),
            release,
            what,
        })
    }

    /// Exclusive access for the duration of one native call sequence.
    ///
    /// Poisoning is ignored: a panic on the host side does not invalidate the
    /// native handle.
    pub(crate) fn lock(&self) -> MutexGuard<'_, RawHandle> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        let ptr = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ptr();
        match self.release {
            Some(release) => {
                unsafe { release(ptr) };
                tracing::debug!(what = self.what, "released native handle");
            }
            None => {
                tracing::debug!(what = self.what, "library exports no release function; handle left to native side");
            }
        }
    }
}
