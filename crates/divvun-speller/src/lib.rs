//! Safe handles over the `divvunspell` native speller library.
//!
//! Loads the library, opens dictionary archives, derives spellers from them
//! and runs correctness checks and suggestion queries. Every native failure
//! reported through the error callback surfaces as an [`Error`]; nothing is
//! silently turned into `false` or an empty list.
//!
//! # Architecture
//!
//! - [`library`] -- dynamic loading, symbol resolution, process-wide registration
//! - [`archive`] -- archive handle (`archive_open`, `archive_speller`)
//! - [`speller`] -- speller handle (`is_correct`, `suggest`, timeouts)
//! - [`registry`] -- spellers by language tag, configured from JSON
//! - [`watcher`] -- archive that reopens when its file changes
//! - [`error`] -- error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use divvun_speller::{Archive, ArchiveFormat, NativeLibrary};
//!
//! let library = unsafe { NativeLibrary::discover(None) }?;
//! let archive = Archive::open(&library, "se.zhfst", ArchiveFormat::Zip)?;
//! let speller = archive.speller()?;
//! if !speller.is_correct("helo")? {
//!     println!("{:?}", speller.suggest("helo")?);
//! }
//! # Ok::<(), divvun_speller::Error>(())
//! ```

pub mod archive;
pub mod error;
mod handle;
pub mod library;
pub mod registry;
pub mod speller;
mod suggestions;
pub mod watcher;

pub use archive::Archive;
pub use divvun_abi::{ArchiveFormat, CaseHandlingConfig, SpellerConfig};
pub use error::{Error, ErrorKind, Result};
pub use library::NativeLibrary;
pub use registry::{ConfigError, RegistryConfig, SpellerEntry, SpellerRegistry};
pub use speller::Speller;
pub use watcher::ArchiveWatcher;
