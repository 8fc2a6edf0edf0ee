// Native binding surface: entry point signatures and symbol names.
//
// Two archive flavors share one call shape. Each flavor is described by a
// `FormatSymbols` table of exported names and resolved into a `FormatFns`
// table of function pointers; the suggestion vector accessors are shared.

use std::ffi::{c_long, c_void};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channel::ErrorCallback;
use crate::config::CSpellerConfig;
use crate::slice::Slice;

// ── Entry point signatures ──────────────────────────────────────

pub type ArchiveOpenFn = unsafe extern "C" fn(path: Slice, error: ErrorCallback) -> *mut c_void;

pub type ArchiveSpellerFn =
    unsafe extern "C" fn(archive: *mut c_void, error: ErrorCallback) -> *mut c_void;

pub type IsCorrectFn =
    unsafe extern "C" fn(speller: *mut c_void, word: Slice, error: ErrorCallback) -> bool;

pub type SuggestFn =
    unsafe extern "C" fn(speller: *mut c_void, word: Slice, error: ErrorCallback) -> Slice;

pub type SuggestWithConfigFn = unsafe extern "C" fn(
    speller: *mut c_void,
    word: Slice,
    config: *const CSpellerConfig,
    error: ErrorCallback,
) -> Slice;

pub type VecLenFn = unsafe extern "C" fn(suggestions: Slice, error: ErrorCallback) -> c_long;

pub type VecGetValueFn =
    unsafe extern "C" fn(suggestions: Slice, index: c_long, error: ErrorCallback) -> Slice;

pub type VecFreeFn = unsafe extern "C" fn(suggestions: Slice);

pub type ReleaseFn = unsafe extern "C" fn(handle: *mut c_void);

// ── Symbol names ────────────────────────────────────────────────

/// Exported names of one archive flavor's entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSymbols {
    pub archive_open: &'static str,
    pub archive_speller: &'static str,
    pub is_correct: &'static str,
    pub suggest: &'static str,
    pub suggest_with_config: &'static str,
    pub archive_free: &'static str,
    pub speller_free: &'static str,
}

pub const ZIP_SYMBOLS: FormatSymbols = FormatSymbols {
    archive_open: "divvun_hfst_zip_speller_archive_open",
    archive_speller: "divvun_hfst_zip_speller_archive_speller",
    is_correct: "divvun_hfst_zip_speller_is_correct",
    suggest: "divvun_hfst_zip_speller_suggest",
    suggest_with_config: "divvun_hfst_zip_speller_suggest_with_config",
    archive_free: "divvun_hfst_zip_speller_archive_free",
    speller_free: "divvun_hfst_zip_speller_speller_free",
};

pub const CHUNKED_SYMBOLS: FormatSymbols = FormatSymbols {
    archive_open: "divvun_thfst_chunked_box_speller_archive_open",
    archive_speller: "divvun_thfst_chunked_box_speller_archive_speller",
    is_correct: "divvun_thfst_chunked_box_speller_is_correct",
    suggest: "divvun_thfst_chunked_box_speller_suggest",
    suggest_with_config: "divvun_thfst_chunked_box_speller_suggest_with_config",
    archive_free: "divvun_thfst_chunked_box_speller_archive_free",
    speller_free: "divvun_thfst_chunked_box_speller_speller_free",
};

pub const VEC_SUGGESTION_LEN: &str = "divvun_vec_suggestion_len";
pub const VEC_SUGGESTION_GET_VALUE: &str = "divvun_vec_suggestion_get_value";
pub const VEC_SUGGESTION_FREE: &str = "divvun_vec_suggestion_free";

// ── Archive flavors ─────────────────────────────────────────────

/// Dictionary archive flavor understood by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// Zipped HFST speller archive (`.zhfst`).
    Zip,
    /// Chunked box THFST speller archive (`.bhfst`).
    Chunked,
}

/// Error for an unrecognized archive flavor name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archive format `{0}` (expected zip or chunked)")]
pub struct UnknownFormat(pub String);

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 2] = [ArchiveFormat::Zip, ArchiveFormat::Chunked];

    pub fn symbols(self) -> &'static FormatSymbols {
        match self {
            ArchiveFormat::Zip => &ZIP_SYMBOLS,
            ArchiveFormat::Chunked => &CHUNKED_SYMBOLS,
        }
    }

    /// Conventional file extension for archives of this flavor.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zhfst",
            ArchiveFormat::Chunked => "bhfst",
        }
    }

    /// Guess the flavor from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Chunked => "chunked",
        })
    }
}

impl FromStr for ArchiveFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" | "zhfst" => Ok(ArchiveFormat::Zip),
            "chunked" | "bhfst" => Ok(ArchiveFormat::Chunked),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

// ── Function tables ─────────────────────────────────────────────

/// Resolved entry points of one archive flavor.
#[derive(Debug, Clone, Copy)]
pub struct FormatFns {
    pub archive_open: ArchiveOpenFn,
    pub archive_speller: ArchiveSpellerFn,
    pub is_correct: IsCorrectFn,
    pub suggest: SuggestFn,
    pub suggest_with_config: Option<SuggestWithConfigFn>,
    /// Not every library build exports release functions; absent means the
    /// native side never frees the handle.
    pub archive_free: Option<ReleaseFn>,
    pub speller_free: Option<ReleaseFn>,
}

/// Resolved suggestion vector accessors.
#[derive(Debug, Clone, Copy)]
pub struct VecFns {
    pub len: VecLenFn,
    pub get_value: VecGetValueFn,
    pub free: Option<VecFreeFn>,
}

/// The complete binding surface of one native library.
#[derive(Debug, Clone, Copy)]
pub struct NativeApi {
    pub zip: Option<FormatFns>,
    pub chunked: Option<FormatFns>,
    pub vec: VecFns,
}

impl NativeApi {
    pub fn format(&self, format: ArchiveFormat) -> Option<&FormatFns> {
        match format {
            ArchiveFormat::Zip => self.zip.as_ref(),
            ArchiveFormat::Chunked => self.chunked.as_ref(),
        }
    }

    pub fn format_mut(&mut self, format: ArchiveFormat) -> Option<&mut FormatFns> {
        match format {
            ArchiveFormat::Zip => self.zip.as_mut(),
            ArchiveFormat::Chunked => self.chunked.as_mut(),
        }
    }

    /// Flavors this library can open.
    pub fn formats(&self) -> impl Iterator<Item = ArchiveFormat> + '_ {
        ArchiveFormat::ALL
            .into_iter()
            .filter(|f| self.format(*f).is_some())
    }

    /// Drop every optional release entry point, as if the library never
    /// exported them.
    pub fn without_release(mut self) -> Self {
        for fns in [self.zip.as_mut(), self.chunked.as_mut()].into_iter().flatten() {
            fns.archive_free = None;
            fns.speller_free = None;
        }
        self.vec.free = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_from_extension() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/data/se.zhfst")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("sma.BHFST")),
            Some(ArchiveFormat::Chunked)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("se.txt")), None);
        assert_eq!(ArchiveFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn flavor_from_str() {
        assert_eq!("zip".parse(), Ok(ArchiveFormat::Zip));
        assert_eq!("Chunked".parse(), Ok(ArchiveFormat::Chunked));
        assert_eq!("bhfst".parse(), Ok(ArchiveFormat::Chunked));
        assert_eq!(
            "tar".parse::<ArchiveFormat>(),
            Err(UnknownFormat("tar".into()))
        );
    }

    #[test]
    fn flavor_display_parses_back() {
        for format in ArchiveFormat::ALL {
            assert_eq!(format.to_string().parse(), Ok(format));
        }
    }

    #[test]
    fn symbol_tables_share_shape() {
        for format in ArchiveFormat::ALL {
            let s = format.symbols();
            let prefix = s.archive_open.strip_suffix("_archive_open").unwrap();
            assert_eq!(s.archive_speller, format!("{prefix}_archive_speller"));
            assert_eq!(s.is_correct, format!("{prefix}_is_correct"));
            assert_eq!(s.suggest, format!("{prefix}_suggest"));
        }
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&ArchiveFormat::Chunked).unwrap();
        assert_eq!(json, "\"chunked\"");
    }
}
