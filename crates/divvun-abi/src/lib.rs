//! C ABI contract between host code and the `divvunspell` native library.
//!
//! Everything in this crate is about agreeing with the native side on bytes
//! and calling conventions. Nothing here loads a library or owns a handle;
//! that lives in `divvun-speller`.
//!
//! # Architecture
//!
//! - [`slice`] -- `{data, len}` slice descriptor, encoder and decoder
//! - [`channel`] -- per-call error channel behind the native error callback
//! - [`config`] -- speller configuration and its `#[repr(C)]` mirror
//! - [`surface`] -- entry point signatures, symbol names, archive flavors
//!
//! # Memory management rules
//!
//! - Slices produced by [`slice::encode`] are owned by the caller and freed
//!   when the [`slice::EncodedSlice`] is dropped. The native side only
//!   borrows them for the duration of one call.
//! - Slices returned by the native side are borrowed. They are read with
//!   [`slice::decode`] and never freed by the host.

pub mod channel;
pub mod config;
pub mod slice;
pub mod surface;

pub use channel::{ErrorCallback, ErrorChannel, NativeError};
pub use config::{CCaseHandlingConfig, CSpellerConfig, CaseHandlingConfig, SpellerConfig};
pub use slice::{DecodeError, EncodedSlice, Slice, decode, encode};
pub use surface::{ArchiveFormat, FormatFns, FormatSymbols, NativeApi, VecFns};
