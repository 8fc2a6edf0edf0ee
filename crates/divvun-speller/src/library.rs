// Native library loading and process-wide registration.
//
// A `NativeLibrary` owns the loaded shared object together with the
// function table resolved from it. Archives and spellers hold an `Arc` to
// it, so the code they call into stays mapped while any handle is alive.
// A table built in-process (`from_api`) needs no shared object at all.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use divvun_abi::ArchiveFormat;
use divvun_abi::surface::{self, FormatFns, FormatSymbols, NativeApi, VecFns};
use libloading::Library;

use crate::error::{Error, Result};

/// Base name of the native speller library.
pub const LIBRARY_NAME: &str = "divvunspell";

/// Environment variable naming the library file or its directory.
pub const LIBRARY_PATH_ENV: &str = "DIVVUNSPELL_LIB_PATH";

/// A loaded speller library and its resolved binding surface.
pub struct NativeLibrary {
    api: NativeApi,
    origin: Option<PathBuf>,
    // Declared last: the shared object must outlive every use of `api`.
    _library: Option<Library>,
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("origin", &self.origin)
            .field("formats", &self.api.formats().collect::<Vec<_>>())
            .finish()
    }
}

impl NativeLibrary {
    /// Wrap a function table whose code is linked into this process.
    pub fn from_api(api: NativeApi) -> Arc<Self> {
        Arc::new(Self {
            api,
            origin: None,
            _library: None,
        })
    }

    /// Load the shared library at `path` and resolve its entry points.
    ///
    /// # Safety
    ///
    /// Loading runs the library's initializers, and every resolved symbol is
    /// trusted to have the signature declared in `divvun_abi::surface`.
    pub unsafe fn load(path: &Path) -> Result<Arc<Self>> {
        let library = unsafe { Library::new(path) }.map_err(|source| Error::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let api = unsafe { resolve_api(&library) }?;
        tracing::debug!(
            path = %path.display(),
            formats = ?api.formats().collect::<Vec<_>>(),
            "loaded native speller library"
        );
        Ok(Arc::new(Self {
            api,
            origin: Some(path.to_path_buf()),
            _library: Some(library),
        }))
    }

    /// Find the library on the search path (see [`search_paths`]) and load it.
    ///
    /// # Safety
    ///
    /// Same contract as [`NativeLibrary::load`].
    pub unsafe fn discover(explicit: Option<&Path>) -> Result<Arc<Self>> {
        let candidates = search_paths(explicit);
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => unsafe { Self::load(path) },
            None => Err(Error::LibraryNotFound {
                name: library_file_name(),
                searched: candidates
                    .iter()
                    .map(|p| format!("  - {}", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            }),
        }
    }

    pub fn api(&self) -> &NativeApi {
        &self.api
    }

    /// Path the library was loaded from; `None` for in-process tables.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn supports(&self, format: ArchiveFormat) -> bool {
        self.api.format(format).is_some()
    }

    pub(crate) fn format_fns(&self, format: ArchiveFormat) -> Result<FormatFns> {
        self.api
            .format(format)
            .copied()
            .ok_or(Error::FormatUnavailable(format))
    }

    pub(crate) fn vec_fns(&self) -> VecFns {
        self.api.vec
    }
}

// ── Symbol resolution ───────────────────────────────────────────

unsafe fn required<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    let found = unsafe { library.get::<T>(symbol.as_bytes()) }
        .map_err(|source| Error::MissingSymbol { symbol, source })?;
    Ok(*found)
}

unsafe fn optional<T: Copy>(library: &Library, symbol: &'static str) -> Option<T> {
    match unsafe { library.get::<T>(symbol.as_bytes()) } {
        Ok(found) => Some(*found),
        Err(_) => {
            tracing::debug!(symbol, "optional entry point not exported");
            None
        }
    }
}

/// Resolve one flavor. Fails when any of its required entry points is missing.
unsafe fn resolve_format(library: &Library, symbols: &FormatSymbols) -> Result<FormatFns> {
    unsafe {
        Ok(FormatFns {
            archive_open: required(library, symbols.archive_open)?,
            archive_speller: required(library, symbols.archive_speller)?,
            is_correct: required(library, symbols.is_correct)?,
            suggest: required(library, symbols.suggest)?,
            suggest_with_config: optional(library, symbols.suggest_with_config),
            archive_free: optional(library, symbols.archive_free),
            speller_free: optional(library, symbols.speller_free),
        })
    }
}

unsafe fn resolve_api(library: &Library) -> Result<NativeApi> {
    let zip = unsafe { resolve_format(library, ArchiveFormat::Zip.symbols()) };
    let chunked = unsafe { resolve_format(library, ArchiveFormat::Chunked.symbols()) };
    let (zip, chunked) = match (zip, chunked) {
        (Err(e), Err(_)) => return Err(e),
        (zip, chunked) => (flavor(ArchiveFormat::Zip, zip), flavor(ArchiveFormat::Chunked, chunked)),
    };
    let vec = unsafe {
        VecFns {
            len: required(library, surface::VEC_SUGGESTION_LEN)?,
            get_value: required(library, surface::VEC_SUGGESTION_GET_VALUE)?,
            free: optional(library, surface::VEC_SUGGESTION_FREE),
        }
    };
    Ok(NativeApi { zip, chunked, vec })
}

fn flavor(format: ArchiveFormat, resolved: Result<FormatFns>) -> Option<FormatFns> {
    resolved
        .inspect_err(|e| tracing::debug!(%format, error = %e, "archive flavor not available"))
        .ok()
}

// ── Search paths ────────────────────────────────────────────────

/// Platform file name of the library, e.g. `libdivvunspell.so`.
pub fn library_file_name() -> String {
    format!("{DLL_PREFIX}{LIBRARY_NAME}{DLL_SUFFIX}")
}

/// Candidate library files, in search order.
///
/// 1. `explicit` (a file, or a directory containing the library)
/// 2. `DIVVUNSPELL_LIB_PATH` (same interpretation)
/// 3. Directory of the running executable
/// 4. System library directories
/// 5. Current working directory
pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let name = library_file_name();
    let mut paths = Vec::new();

    let mut push_location = |p: PathBuf| {
        if p.is_dir() {
            paths.push(p.join(&name));
        } else {
            paths.push(p);
        }
    };

    if let Some(p) = explicit {
        push_location(p.to_path_buf());
    }

    if let Some(env_path) = std::env::var_os(LIBRARY_PATH_ENV) {
        push_location(PathBuf::from(env_path));
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(&name));
    }

    #[cfg(target_os = "linux")]
    for dir in ["/usr/local/lib", "/usr/lib", "/usr/lib64", "/lib"] {
        paths.push(PathBuf::from(dir).join(&name));
    }

    #[cfg(target_os = "macos")]
    for dir in ["/usr/local/lib", "/opt/homebrew/lib", "/usr/lib"] {
        paths.push(PathBuf::from(dir).join(&name));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(&name));
    }

    paths
}

// ── Process-wide registration ───────────────────────────────────

static GLOBAL: OnceLock<Arc<NativeLibrary>> = OnceLock::new();

/// Register `library` as the process-wide speller library.
///
/// Must be called once, before [`global`]; a second call fails with
/// [`Error::AlreadyInitialized`] and leaves the first registration in place.
pub fn init(library: Arc<NativeLibrary>) -> Result<Arc<NativeLibrary>> {
    GLOBAL
        .set(Arc::clone(&library))
        .map_err(|_| Error::AlreadyInitialized)?;
    tracing::debug!(origin = ?library.origin(), "registered process-wide speller library");
    Ok(library)
}

/// The library registered with [`init`].
pub fn global() -> Result<Arc<NativeLibrary>> {
    GLOBAL.get().cloned().ok_or(Error::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_platform_affixes() {
        let name = library_file_name();
        assert!(name.contains(LIBRARY_NAME));
        assert!(name.ends_with(DLL_SUFFIX));
    }

    #[test]
    fn explicit_file_comes_first() {
        let explicit = Path::new("/opt/speller/libcustom.so");
        let paths = search_paths(Some(explicit));
        assert_eq!(paths[0], explicit);
    }

    #[test]
    fn explicit_directory_is_joined_with_file_name() {
        let dir = std::env::temp_dir();
        let paths = search_paths(Some(&dir));
        assert_eq!(paths[0], dir.join(library_file_name()));
    }

    #[test]
    fn cwd_is_last() {
        let paths = search_paths(None);
        if let Ok(cwd) = std::env::current_dir() {
            assert_eq!(paths.last(), Some(&cwd.join(library_file_name())));
        }
    }

    #[test]
    fn discover_missing_library_lists_search_paths() {
        let missing = Path::new("/nonexistent/dir/libnothing.so");
        let Err(err) = (unsafe { NativeLibrary::discover(Some(missing)) }) else {
            // A real libdivvunspell installed on the host satisfies discovery.
            return;
        };
        match err {
            Error::LibraryNotFound { searched, .. } => {
                assert!(searched.contains("/nonexistent/dir/libnothing.so"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_nonexistent_path_fails() {
        let err = unsafe { NativeLibrary::load(Path::new("/nonexistent/libdivvunspell.so")) }
            .unwrap_err();
        assert!(matches!(err, Error::LibraryLoad { .. }));
    }

    #[test]
    fn in_process_table_has_no_origin() {
        let library = NativeLibrary::from_api(divvun_mock::api());
        assert_eq!(library.origin(), None);
        assert!(library.supports(ArchiveFormat::Zip));
        assert!(library.supports(ArchiveFormat::Chunked));
    }

    #[test]
    fn missing_flavor_is_unavailable() {
        let mut api = divvun_mock::api();
        api.chunked = None;
        let library = NativeLibrary::from_api(api);
        assert!(matches!(
            library.format_fns(ArchiveFormat::Chunked),
            Err(Error::FormatUnavailable(ArchiveFormat::Chunked))
        ));
    }
}
