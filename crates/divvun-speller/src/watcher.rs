// Archive that follows its file on disk.
//
// Every access stats the archive path. A changed modification time reopens
// the archive; a missing file drops it. Nothing is watched in the
// background.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use divvun_abi::ArchiveFormat;

use crate::archive::Archive;
use crate::error::Result;
use crate::library::NativeLibrary;
use crate::speller::Speller;

#[derive(Default)]
struct WatchState {
    polled: bool,
    stamp: Option<SystemTime>,
    archive: Option<Archive>,
    speller: Option<Speller>,
}

/// Keeps an [`Archive`] in step with the file it was opened from.
pub struct ArchiveWatcher {
    library: Arc<NativeLibrary>,
    path: PathBuf,
    format: Option<ArchiveFormat>,
    state: Mutex<WatchState>,
}

impl std::fmt::Debug for ArchiveWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWatcher")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish()
    }
}

impl ArchiveWatcher {
    /// Watch `path`. With `format` unset the flavor is taken from the file
    /// extension. Nothing is opened until the first access.
    pub fn new(library: Arc<NativeLibrary>, path: impl Into<PathBuf>, format: Option<ArchiveFormat>) -> Self {
        Self {
            library,
            path: path.into(),
            format,
            state: Mutex::new(WatchState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current archive, reopened if the file changed since the last call.
    ///
    /// `None` when the file does not exist or the latest version of it could
    /// not be opened.
    pub fn archive(&self) -> Option<Archive> {
        self.poll().archive.clone()
    }

    /// A speller derived from the current archive.
    ///
    /// The speller is cached until the archive is reopened.
    pub fn speller(&self) -> Option<Speller> {
        let mut state = self.poll();
        if state.speller.is_none() {
            let archive = state.archive.as_ref()?;
            match archive.speller() {
                Ok(speller) => state.speller = Some(speller),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "cannot derive speller from archive");
                    return None;
                }
            }
        }
        state.speller.clone()
    }

    /// Reopen the archive now, whether or not the file changed.
    pub fn refresh(&self) -> Option<Archive> {
        let mut state = self.lock();
        let stamp = modified(&self.path);
        self.reload(&mut state, stamp);
        state.archive.clone()
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll(&self) -> MutexGuard<'_, WatchState> {
        let mut state = self.lock();
        if !self.path.exists() {
            if state.archive.is_some() {
                tracing::debug!(path = %self.path.display(), "archive file removed; dropping archive");
            }
            *state = WatchState::default();
            return state;
        }

        let stamp = modified(&self.path);
        if !state.polled || stamp != state.stamp {
            self.reload(&mut state, stamp);
        }
        state
    }

    fn reload(&self, state: &mut WatchState, stamp: Option<SystemTime>) {
        state.polled = true;
        state.stamp = stamp;
        state.speller = None;
        state.archive = match self.open() {
            Ok(archive) => {
                tracing::debug!(path = %self.path.display(), "loaded watched archive");
                Some(archive)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot reload archive");
                None
            }
        };
    }

    fn open(&self) -> Result<Archive> {
        match self.format {
            Some(format) => Archive::open(&self.library, &self.path, format),
            None => Archive::open_detected(&self.library, &self.path),
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
