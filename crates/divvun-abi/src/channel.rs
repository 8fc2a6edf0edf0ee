// Per-call error channel.
//
// The native library reports failures by invoking a plain C callback with a
// NUL-terminated message. The callback carries no user data, so the message
// is parked in a thread-local slot. Native calls are synchronous and run on
// the calling thread, which makes the slot private to the call in flight.
// An `ErrorChannel` clears the slot when it is opened and drains it when it
// is finished, so nothing leaks from one call into the next.

use std::cell::RefCell;
use std::ffi::{CStr, c_char};
use std::marker::PhantomData;

/// Signature of the error callback every native entry point accepts.
pub type ErrorCallback = extern "C" fn(message: *const c_char);

/// Failure reported by the native side through the error channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{call} failed: {message}")]
pub struct NativeError {
    /// Native entry point that reported the failure.
    pub call: &'static str,
    /// Message passed to the error callback.
    pub message: String,
}

thread_local! {
    static REPORTED: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// The callback handed to native code. Keeps the first message of a call.
extern "C" fn record_error(message: *const c_char) {
    let message = if message.is_null() {
        String::from("error reported without a message")
    } else {
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    };

    // Must not unwind into native code: every failure path here is silent.
    let _ = REPORTED.try_with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return;
        };
        match slot.as_ref() {
            None => *slot = Some(message),
            Some(first) => {
                tracing::debug!(first = %first, ignored = %message, "additional native error in one call");
            }
        }
    });
}

fn take_reported() -> Option<String> {
    REPORTED
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()))
        .ok()
        .flatten()
}

/// Scoped view of the error slot for exactly one native call.
///
/// Not `Send`: the slot it guards belongs to the current thread.
#[derive(Debug)]
pub struct ErrorChannel {
    call: &'static str,
    _thread_bound: PhantomData<*const ()>,
}

impl ErrorChannel {
    /// Open a channel for a call to the native entry point `call`.
    pub fn open(call: &'static str) -> Self {
        if let Some(stale) = take_reported() {
            tracing::debug!(call, stale = %stale, "discarding stale native error");
        }
        Self {
            call,
            _thread_bound: PhantomData,
        }
    }

    /// The callback to pass to the native entry point.
    pub fn callback(&self) -> ErrorCallback {
        record_error
    }

    /// Name of the native entry point this channel belongs to.
    pub fn call(&self) -> &'static str {
        self.call
    }

    /// Close the channel: the call's return value is authoritative only when
    /// nothing was reported.
    pub fn finish<T>(self, value: T) -> Result<T, NativeError> {
        match take_reported() {
            Some(message) => Err(NativeError {
                call: self.call,
                message,
            }),
            None => Ok(value),
        }
    }
}

impl Drop for ErrorChannel {
    fn drop(&mut self) {
        let _ = take_reported();
    }
}

/// Run one native call with a fresh channel and fold the outcome into a
/// `Result`.
///
/// `f` receives the callback to pass through and must perform exactly one
/// native call.
pub fn call<T>(
    name: &'static str,
    f: impl FnOnce(ErrorCallback) -> T,
) -> Result<T, NativeError> {
    let channel = ErrorChannel::open(name);
    let value = f(channel.callback());
    channel.finish(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    extern "C" fn fails(error: ErrorCallback) -> bool {
        let msg = CString::new("archive is corrupt").unwrap();
        error(msg.as_ptr());
        true
    }

    extern "C" fn succeeds(_error: ErrorCallback) -> bool {
        true
    }

    extern "C" fn fails_twice(error: ErrorCallback) -> i32 {
        let first = CString::new("first").unwrap();
        let second = CString::new("second").unwrap();
        error(first.as_ptr());
        error(second.as_ptr());
        -1
    }

    #[test]
    fn unpopulated_channel_returns_value() {
        assert_eq!(call("succeeds", |err| succeeds(err)), Ok(true));
    }

    #[test]
    fn populated_channel_discards_value() {
        let err = call("fails", |err| fails(err)).unwrap_err();
        assert_eq!(err.call, "fails");
        assert_eq!(err.message, "archive is corrupt");
        assert_eq!(err.to_string(), "fails failed: archive is corrupt");
    }

    #[test]
    fn first_message_wins() {
        let err = call("fails_twice", |err| fails_twice(err)).unwrap_err();
        assert_eq!(err.message, "first");
    }

    #[test]
    fn error_does_not_leak_into_next_call() {
        assert!(call("fails", |err| fails(err)).is_err());
        assert_eq!(call("succeeds", |err| succeeds(err)), Ok(true));
    }

    #[test]
    fn dropped_channel_clears_slot() {
        {
            let channel = ErrorChannel::open("abandoned");
            fails(channel.callback());
        }
        let channel = ErrorChannel::open("next");
        assert_eq!(channel.finish(7), Ok(7));
    }

    #[test]
    fn null_message_still_counts_as_error() {
        let err = call("null", |err| err(std::ptr::null())).unwrap_err();
        assert_eq!(err.message, "error reported without a message");
    }

    #[test]
    fn channels_are_per_thread() {
        let handle = std::thread::spawn(|| {
            let channel = ErrorChannel::open("worker");
            fails(channel.callback());
            channel.finish(())
        });
        let local = ErrorChannel::open("main");
        assert_eq!(local.finish(1), Ok(1));
        assert!(handle.join().unwrap().is_err());
    }

    #[test]
    fn lossy_message_decoding() {
        let bytes = [b'b', b'a', b'd', 0xFF, 0];
        let err = call("lossy", |cb| cb(bytes.as_ptr().cast())).unwrap_err();
        assert_eq!(err.message, "bad\u{FFFD}");
    }
}
