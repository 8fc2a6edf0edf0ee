// Speller archive handle.
//
// Lifecycle: `Archive::open` (Unopened -> ArchiveOpen), `Archive::speller`
// (ArchiveOpen -> SpellerReady). The last clone of an `Archive` and of every
// `Speller` derived from it releases the native archive (-> Closed).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use divvun_abi::surface::{FormatFns, VecFns};
use divvun_abi::{ArchiveFormat, channel, encode};

use crate::error::{Error, Result};
use crate::handle::OwnedHandle;
use crate::library::NativeLibrary;
use crate::speller::Speller;

pub(crate) struct ArchiveInner {
    pub(crate) handle: OwnedHandle,
    pub(crate) format: ArchiveFormat,
    pub(crate) path: PathBuf,
    pub(crate) fns: FormatFns,
    pub(crate) vec: VecFns,
    // Keeps the native code mapped until the handle above is released.
    pub(crate) _library: Arc<NativeLibrary>,
}

/// An open dictionary archive.
///
/// Cheap to clone. Spellers derived from it keep it alive, so a speller
/// handle is never used after its archive has been released.
#[derive(Clone)]
pub struct Archive {
    pub(crate) inner: Arc<ArchiveInner>,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("format", &self.inner.format)
            .field("path", &self.inner.path)
            .finish()
    }
}

impl Archive {
    /// Open the archive at `path` as `format`.
    pub fn open(library: &Arc<NativeLibrary>, path: impl AsRef<Path>, format: ArchiveFormat) -> Result<Self> {
        let path = path.as_ref();
        let fns = library.format_fns(format)?;

        if !path.exists() {
            return Err(Error::ArchiveNotFound {
                path: path.to_path_buf(),
            });
        }
        let path_str = path.to_str().ok_or_else(|| Error::EncodingFailure {
            what: format!("archive path {}", path.display()),
        })?;

        let encoded = encode(path_str);
        let raw = channel::call(format.symbols().archive_open, |error| unsafe {
            (fns.archive_open)(encoded.as_slice(), error)
        })
        .map_err(|e| Error::ArchiveUnreadable {
            path: path.to_path_buf(),
            message: e.message,
        })?;

        let handle = OwnedHandle::new(raw, fns.archive_free, "archive").ok_or_else(|| {
            Error::ProtocolViolation(format!(
                "{} returned a null archive without reporting an error",
                format.symbols().archive_open
            ))
        })?;

        tracing::debug!(path = %path.display(), %format, "opened speller archive");

        Ok(Self {
            inner: Arc::new(ArchiveInner {
                handle,
                format,
                path: path.to_path_buf(),
                fns,
                vec: library.vec_fns(),
                _library: Arc::clone(library),
            }),
        })
    }

    /// Open the archive at `path`, picking the flavor from its extension.
    pub fn open_detected(library: &Arc<NativeLibrary>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ArchiveFormat::from_path(path).ok_or_else(|| Error::ArchiveUnsupportedFormat {
            path: path.to_path_buf(),
            message: "unrecognized file extension (expected .zhfst or .bhfst)".into(),
        })?;
        Self::open(library, path, format)
    }

    pub fn format(&self) -> ArchiveFormat {
        self.inner.format
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Derive a speller from this archive.
    pub fn speller(&self) -> Result<Speller> {
        let inner = &self.inner;
        let symbol = inner.format.symbols().archive_speller;

        let raw = {
            let archive = inner.handle.lock();
            channel::call(symbol, |error| unsafe {
                (inner.fns.archive_speller)(archive.as_ptr(), error)
            })
        }
        .map_err(|e| Error::ArchiveUnsupportedFormat {
            path: inner.path.clone(),
            message: e.message,
        })?;

        let handle = OwnedHandle::new(raw, inner.fns.speller_free, "speller").ok_or_else(|| {
            Error::ProtocolViolation(format!(
                "{symbol} returned a null speller without reporting an error"
            ))
        })?;

        Ok(Speller::new(handle, Arc::clone(&self.inner)))
    }
}
