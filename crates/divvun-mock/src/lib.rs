// FFI functions are inherently unsafe: callers must ensure pointer validity.
#![allow(clippy::missing_safety_doc)]

// divvun-mock: word-list implementation of the divvunspell C ABI.
//
// Exports every entry point of both archive flavors (zip and chunked box)
// plus the suggestion vector accessors and the optional release functions,
// with the exact names and signatures of the real library. Archives are
// plain-text word lists (see `lexicon`), so results are deterministic.
//
// Memory management rules:
// - Archive and speller handles are boxed; freed by the `*_free` functions.
// - A suggestion vector is a slice whose `data` points at a boxed list and
//   whose `len` is the element count; freed by `divvun_vec_suggestion_free`.
// - Element slices returned by `divvun_vec_suggestion_get_value` borrow from
//   the vector and stay valid until it is freed.
// - Input slices are only read during the call.
//
// Every handle allocation and release is counted, so tests can check that a
// client releases each handle exactly once.

pub mod lexicon;

use std::ffi::{CString, c_long, c_void};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use divvun_abi::surface::{FormatFns, NativeApi, VecFns};
use divvun_abi::{ArchiveFormat, CSpellerConfig, ErrorCallback, Slice, SpellerConfig};

use crate::lexicon::Lexicon;

// ── Handle bookkeeping ──────────────────────────────────────────

static ARCHIVES_OPENED: AtomicUsize = AtomicUsize::new(0);
static ARCHIVES_FREED: AtomicUsize = AtomicUsize::new(0);
static SPELLERS_OPENED: AtomicUsize = AtomicUsize::new(0);
static SPELLERS_FREED: AtomicUsize = AtomicUsize::new(0);
static VECTORS_OPENED: AtomicUsize = AtomicUsize::new(0);
static VECTORS_FREED: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of handle allocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleCounts {
    pub archives_opened: usize,
    pub archives_freed: usize,
    pub spellers_opened: usize,
    pub spellers_freed: usize,
    pub vectors_opened: usize,
    pub vectors_freed: usize,
}

pub fn handle_counts() -> HandleCounts {
    HandleCounts {
        archives_opened: ARCHIVES_OPENED.load(Ordering::SeqCst),
        archives_freed: ARCHIVES_FREED.load(Ordering::SeqCst),
        spellers_opened: SPELLERS_OPENED.load(Ordering::SeqCst),
        spellers_freed: SPELLERS_FREED.load(Ordering::SeqCst),
        vectors_opened: VECTORS_OPENED.load(Ordering::SeqCst),
        vectors_freed: VECTORS_FREED.load(Ordering::SeqCst),
    }
}

struct MockArchive {
    format: ArchiveFormat,
    lexicon: Arc<Lexicon>,
}

struct MockSpeller {
    lexicon: Arc<Lexicon>,
}

struct SuggestionList(Vec<String>);

// ── Generic implementations ─────────────────────────────────────

fn report(error: ErrorCallback, message: &str) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    error(message.as_ptr());
}

unsafe fn input_str<'a>(slice: Slice) -> Result<&'a str, String> {
    let bytes = unsafe { slice.as_bytes() }.unwrap_or_default();
    std::str::from_utf8(bytes).map_err(|e| format!("input is not valid UTF-8: {e}"))
}

unsafe fn archive_open(format: ArchiveFormat, path: Slice, error: ErrorCallback) -> *mut c_void {
    let path = match unsafe { input_str(path) } {
        Ok(p) if !p.is_empty() => p,
        Ok(_) => {
            report(error, "archive path is empty");
            return ptr::null_mut();
        }
        Err(e) => {
            report(error, &e);
            return ptr::null_mut();
        }
    };
    match Lexicon::from_file(Path::new(path)) {
        Ok(lexicon) => {
            ARCHIVES_OPENED.fetch_add(1, Ordering::SeqCst);
            let archive = MockArchive {
                format,
                lexicon: Arc::new(lexicon),
            };
            Box::into_raw(Box::new(archive)).cast()
        }
        Err(e) => {
            report(error, &format!("{path}: {e}"));
            ptr::null_mut()
        }
    }
}

unsafe fn archive_speller(handle: *mut c_void, error: ErrorCallback) -> *mut c_void {
    let Some(archive) = (unsafe { handle.cast::<MockArchive>().as_ref() }) else {
        report(error, "archive handle is null");
        return ptr::null_mut();
    };
    if archive.lexicon.format != Some(archive.format) {
        let found = archive
            .lexicon
            .format
            .map_or_else(|| "unknown".to_string(), |f| f.to_string());
        report(
            error,
            &format!("unsupported archive: expected {} archive, found {found}", archive.format),
        );
        return ptr::null_mut();
    }
    if !archive.lexicon.has_speller() {
        report(error, "archive has no speller section");
        return ptr::null_mut();
    }
    SPELLERS_OPENED.fetch_add(1, Ordering::SeqCst);
    let speller = MockSpeller {
        lexicon: Arc::clone(&archive.lexicon),
    };
    Box::into_raw(Box::new(speller)).cast()
}

unsafe fn speller_ref<'a>(handle: *mut c_void, error: ErrorCallback) -> Option<&'a MockSpeller> {
    let speller = unsafe { handle.cast::<MockSpeller>().as_ref() };
    if speller.is_none() {
        report(error, "speller handle is null");
    }
    speller
}

unsafe fn is_correct(speller: *mut c_void, word: Slice, error: ErrorCallback) -> bool {
    let Some(speller) = (unsafe { speller_ref(speller, error) }) else {
        return false;
    };
    let word = match unsafe { input_str(word) } {
        Ok(w) => w,
        Err(e) => {
            report(error, &e);
            return false;
        }
    };
    if speller.lexicon.fails_on(word) {
        // The return value is deliberately misleading: clients must trust
        // the error channel, not this.
        report(error, &format!("speller failed on `{word}`"));
        return true;
    }
    speller.lexicon.is_correct(word)
}

unsafe fn suggest(
    speller: *mut c_void,
    word: Slice,
    config: SpellerConfig,
    error: ErrorCallback,
) -> Slice {
    let Some(speller) = (unsafe { speller_ref(speller, error) }) else {
        return Slice::ABSENT;
    };
    let word = match unsafe { input_str(word) } {
        Ok(w) => w,
        Err(e) => {
            report(error, &e);
            return Slice::ABSENT;
        }
    };
    if speller.lexicon.fails_on(word) {
        report(error, &format!("speller failed on `{word}`"));
        // Garbage a client must never dereference.
        return Slice {
            data: NonNull::<u8>::dangling().as_ptr(),
            len: 7,
        };
    }
    let list = speller
        .lexicon
        .suggest(word, config.n_best, config.max_weight);
    let len = list.len();
    VECTORS_OPENED.fetch_add(1, Ordering::SeqCst);
    Slice {
        data: Box::into_raw(Box::new(SuggestionList(list))).cast::<u8>(),
        len,
    }
}

unsafe fn suggestion_list<'a>(vec: Slice, error: ErrorCallback) -> Option<&'a SuggestionList> {
    let list = unsafe { vec.data.cast::<SuggestionList>().as_ref() };
    if list.is_none() {
        report(error, "suggestion vector is null");
    }
    list
}

unsafe fn free_boxed<T>(handle: *mut c_void, counter: &AtomicUsize) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle.cast::<T>()) });
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Exported entry points ───────────────────────────────────────

macro_rules! speller_flavor {
    (
        $format:expr,
        $open:ident,
        $speller:ident,
        $is_correct:ident,
        $suggest:ident,
        $suggest_with_config:ident,
        $archive_free:ident,
        $speller_free:ident $(,)?
    ) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $open(path: Slice, error: ErrorCallback) -> *mut c_void {
            unsafe { archive_open($format, path, error) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $speller(handle: *mut c_void, error: ErrorCallback) -> *mut c_void {
            unsafe { archive_speller(handle, error) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $is_correct(
            speller: *mut c_void,
            word: Slice,
            error: ErrorCallback,
        ) -> bool {
            unsafe { is_correct(speller, word, error) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $suggest(
            speller: *mut c_void,
            word: Slice,
            error: ErrorCallback,
        ) -> Slice {
            unsafe { suggest(speller, word, SpellerConfig::default(), error) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $suggest_with_config(
            speller: *mut c_void,
            word: Slice,
            config: *const CSpellerConfig,
            error: ErrorCallback,
        ) -> Slice {
            let config = unsafe { config.as_ref() }
                .map(SpellerConfig::from)
                .unwrap_or_default();
            unsafe { suggest(speller, word, config, error) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $archive_free(handle: *mut c_void) {
            unsafe { free_boxed::<MockArchive>(handle, &ARCHIVES_FREED) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $speller_free(handle: *mut c_void) {
            unsafe { free_boxed::<MockSpeller>(handle, &SPELLERS_FREED) }
        }
    };
}

speller_flavor!(
    ArchiveFormat::Zip,
    divvun_hfst_zip_speller_archive_open,
    divvun_hfst_zip_speller_archive_speller,
    divvun_hfst_zip_speller_is_correct,
    divvun_hfst_zip_speller_suggest,
    divvun_hfst_zip_speller_suggest_with_config,
    divvun_hfst_zip_speller_archive_free,
    divvun_hfst_zip_speller_speller_free,
);

speller_flavor!(
    ArchiveFormat::Chunked,
    divvun_thfst_chunked_box_speller_archive_open,
    divvun_thfst_chunked_box_speller_archive_speller,
    divvun_thfst_chunked_box_speller_is_correct,
    divvun_thfst_chunked_box_speller_suggest,
    divvun_thfst_chunked_box_speller_suggest_with_config,
    divvun_thfst_chunked_box_speller_archive_free,
    divvun_thfst_chunked_box_speller_speller_free,
);

/// Number of suggestions in a vector returned by a `*_suggest` call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn divvun_vec_suggestion_len(suggestions: Slice, error: ErrorCallback) -> c_long {
    let Some(list) = (unsafe { suggestion_list(suggestions, error) }) else {
        return 0;
    };
    c_long::try_from(list.0.len()).unwrap_or(c_long::MAX)
}

/// Borrow suggestion `index`. The slice stays valid until the vector is freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn divvun_vec_suggestion_get_value(
    suggestions: Slice,
    index: c_long,
    error: ErrorCallback,
) -> Slice {
    let Some(list) = (unsafe { suggestion_list(suggestions, error) }) else {
        return Slice::ABSENT;
    };
    let Some(value) = usize::try_from(index).ok().and_then(|i| list.0.get(i)) else {
        report(
            error,
            &format!("index {index} out of bounds for {} suggestions", list.0.len()),
        );
        return Slice::ABSENT;
    };
    Slice {
        data: value.as_ptr(),
        len: value.len(),
    }
}

/// Free a suggestion vector returned by a `*_suggest` call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn divvun_vec_suggestion_free(suggestions: Slice) {
    unsafe { free_boxed::<SuggestionList>(suggestions.data.cast_mut().cast(), &VECTORS_FREED) }
}

// ── In-process function table ───────────────────────────────────

/// The full binding surface of this library, for use without dynamic loading.
pub fn api() -> NativeApi {
    NativeApi {
        zip: Some(FormatFns {
            archive_open: divvun_hfst_zip_speller_archive_open,
            archive_speller: divvun_hfst_zip_speller_archive_speller,
            is_correct: divvun_hfst_zip_speller_is_correct,
            suggest: divvun_hfst_zip_speller_suggest,
            suggest_with_config: Some(divvun_hfst_zip_speller_suggest_with_config),
            archive_free: Some(divvun_hfst_zip_speller_archive_free),
            speller_free: Some(divvun_hfst_zip_speller_speller_free),
        }),
        chunked: Some(FormatFns {
            archive_open: divvun_thfst_chunked_box_speller_archive_open,
            archive_speller: divvun_thfst_chunked_box_speller_archive_speller,
            is_correct: divvun_thfst_chunked_box_speller_is_correct,
            suggest: divvun_thfst_chunked_box_speller_suggest,
            suggest_with_config: Some(divvun_thfst_chunked_box_speller_suggest_with_config),
            archive_free: Some(divvun_thfst_chunked_box_speller_archive_free),
            speller_free: Some(divvun_thfst_chunked_box_speller_speller_free),
        }),
        vec: VecFns {
            len: divvun_vec_suggestion_len,
            get_value: divvun_vec_suggestion_get_value,
            free: Some(divvun_vec_suggestion_free),
        },
    }
}
