// Speller handle and query operations.

use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use divvun_abi::{
    ArchiveFormat, CSpellerConfig, NativeError, Slice, SpellerConfig, channel, encode,
};

use crate::archive::ArchiveInner;
use crate::error::{Error, Result};
use crate::handle::OwnedHandle;
use crate::suggestions::SuggestionVec;

struct SpellerInner {
    handle: OwnedHandle,
    archive: Arc<ArchiveInner>,
    /// Timed-out calls whose worker thread is still running.
    stalled: AtomicUsize,
}

// States of one timed call.
const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// A speller derived from an [`Archive`](crate::Archive).
///
/// Cheap to clone and safe to share between threads: calls on the same
/// speller are serialized. The originating archive stays open for as long as
/// any clone is alive.
#[derive(Clone)]
pub struct Speller {
    inner: Arc<SpellerInner>,
}

impl std::fmt::Debug for Speller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speller")
            .field("format", &self.format())
            .field("archive", &self.archive_path())
            .finish()
    }
}

impl Speller {
    pub(crate) fn new(handle: OwnedHandle, archive: Arc<ArchiveInner>) -> Self {
        Self {
            inner: Arc::new(SpellerInner {
                handle,
                archive,
                stalled: AtomicUsize::new(0),
            }),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.inner.archive.format
    }

    pub fn archive_path(&self) -> &Path {
        &self.inner.archive.path
    }

    /// Whether the native speller accepts `word`.
    ///
    /// A failure reported by the native side is returned as an error, never
    /// as `false`.
    pub fn is_correct(&self, word: &str) -> Result<bool> {
        let archive = &self.inner.archive;
        let word = encode(word);
        let speller = self.inner.handle.lock();
        let correct = channel::call(archive.format.symbols().is_correct, |error| unsafe {
            (archive.fns.is_correct)(speller.as_ptr(), word.as_slice(), error)
        })?;
        Ok(correct)
    }

    /// Suggestions for `word`, in the order the native speller ranks them.
    ///
    /// An empty list means the speller has no suggestions.
    pub fn suggest(&self, word: &str) -> Result<Vec<String>> {
        let archive = &self.inner.archive;
        let symbol = archive.format.symbols().suggest;
        self.collect_suggestions(word, |speller, word| {
            channel::call(symbol, |error| unsafe {
                (archive.fns.suggest)(speller, word, error)
            })
        })
    }

    /// Suggestions for `word` under `config`.
    ///
    /// Libraries without a configurable suggest entry point fall back to
    /// [`Speller::suggest`]; only `n_best` is then honored.
    pub fn suggest_with_config(&self, word: &str, config: &SpellerConfig) -> Result<Vec<String>> {
        let archive = &self.inner.archive;
        let Some(suggest_with_config) = archive.fns.suggest_with_config else {
            if !config.is_count_only() {
                tracing::warn!(
                    format = %archive.format,
                    "library cannot configure suggestions; only n_best is applied"
                );
            }
            let mut suggestions = self.suggest(word)?;
            if let Some(n_best) = config.n_best {
                suggestions.truncate(n_best);
            }
            return Ok(suggestions);
        };

        let symbol = archive.format.symbols().suggest_with_config;
        let c_config = CSpellerConfig::from(config);
        self.collect_suggestions(word, |speller, word| {
            channel::call(symbol, |error| unsafe {
                suggest_with_config(speller, word, &c_config, error)
            })
        })
    }

    /// Run one suggest entry point and drain the vector it returns, holding
    /// the speller lock until every element has been decoded.
    fn collect_suggestions(
        &self,
        word: &str,
        call: impl FnOnce(*mut c_void, Slice) -> Result<Slice, NativeError>,
    ) -> Result<Vec<String>> {
        let word = encode(word);
        let speller = self.inner.handle.lock();
        let raw = call(speller.as_ptr(), word.as_slice())?;
        let vector = SuggestionVec::new(&self.inner.archive.vec, raw);
        let suggestions = vector.to_vec()?;
        drop(vector);
        drop(speller);
        Ok(suggestions)
    }

    /// [`Speller::is_correct`] with a deadline.
    ///
    /// The native call cannot be cancelled: on timeout it keeps running on a
    /// worker thread (holding a clone of this speller) and its result is
    /// discarded. Until that worker finishes, every timed call on this
    /// speller fails with [`Error::Timeout`] at once instead of starting
    /// another worker, so a hung native call costs one thread, not one per
    /// attempt.
    pub fn is_correct_timeout(&self, word: &str, timeout: Duration) -> Result<bool> {
        let word = word.to_string();
        self.with_timeout(timeout, move |speller| speller.is_correct(&word))
    }

    /// [`Speller::suggest`] with a deadline. See [`Speller::is_correct_timeout`].
    pub fn suggest_timeout(&self, word: &str, timeout: Duration) -> Result<Vec<String>> {
        let word = word.to_string();
        self.with_timeout(timeout, move |speller| speller.suggest(&word))
    }

    /// Whether a timed-out call is still running on a worker thread.
    pub fn is_stalled(&self) -> bool {
        self.inner.stalled.load(Ordering::Acquire) > 0
    }

    fn with_timeout<T: Send + 'static>(
        &self,
        timeout: Duration,
        op: impl FnOnce(&Speller) -> Result<T> + Send + 'static,
    ) -> Result<T> {
        if self.is_stalled() {
            tracing::debug!(?timeout, "previous timed-out call still running; refusing new call");
            return Err(Error::Timeout(timeout));
        }

        let speller = self.clone();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let worker_state = Arc::clone(&state);
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("divvun-speller-call".into())
            .spawn(move || {
                let result = op(&speller);
                let finished = worker_state
                    .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if finished {
                    let _ = tx.send(result);
                } else {
                    speller.inner.stalled.fetch_sub(1, Ordering::AcqRel);
                }
            })
            .map_err(Error::Worker)?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // Counted before the worker can observe ABANDONED.
                self.inner.stalled.fetch_add(1, Ordering::AcqRel);
                let abandoned = state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if abandoned {
                    tracing::debug!(?timeout, "speller call timed out; native call left running");
                    return Err(Error::Timeout(timeout));
                }
                // Finished in the meantime; its result is on the way.
                self.inner.stalled.fetch_sub(1, Ordering::AcqRel);
                rx.recv().map_err(|_| Error::WorkerLost)?
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::WorkerLost),
        }
    }
}
