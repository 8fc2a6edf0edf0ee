//! Spellers looked up by language tag from a JSON config.

mod common;

use std::ffi::c_void;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{Fixture, library, library_with};
use divvun_abi::{ErrorCallback, Slice};
use divvun_speller::{ArchiveFormat, ConfigError, Error, ErrorKind, RegistryConfig, SpellerRegistry};

fn write_config(fixture: &Fixture) -> std::path::PathBuf {
    fixture.sample();
    fixture.sample_chunked();
    fixture.write(
        "spellers.json",
        r#"{
            "spellers": {
                "se": { "path": "se.zhfst" },
                "sma-NO": { "path": "se.bhfst", "format": "chunked", "config": { "n_best": 1 } },
                "smj": { "path": "missing.zhfst" }
            }
        }"#,
    )
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let fixture = Fixture::new();
    let config = RegistryConfig::from_file(&write_config(&fixture)).unwrap();
    assert_eq!(config.spellers["se"].path, fixture.dir.path().join("se.zhfst"));
    assert_eq!(config.spellers["sma-NO"].format, Some(ArchiveFormat::Chunked));
}

#[test]
fn speller_by_exact_and_primary_tag() {
    let fixture = Fixture::new();
    let registry = SpellerRegistry::from_file(library(), &write_config(&fixture)).unwrap();

    let se = registry.speller("se-NO").unwrap();
    assert_eq!(se.format(), ArchiveFormat::Zip);
    assert!(se.is_correct("hello").unwrap());

    let sma = registry.speller("sma-NO").unwrap();
    assert_eq!(sma.format(), ArchiveFormat::Chunked);
    let config = registry.config_for("sma-NO").unwrap();
    assert_eq!(sma.suggest_with_config("helo", &config).unwrap(), ["hello"]);
}

#[test]
fn spellers_are_cached_until_evicted() {
    let fixture = Fixture::new();
    let registry = SpellerRegistry::from_file(library(), &write_config(&fixture)).unwrap();

    let first = registry.speller("se").unwrap();
    std::fs::remove_file(fixture.dir.path().join("se.zhfst")).unwrap();
    // Served from the cache; the file is not reopened.
    assert!(registry.speller("se-FI").unwrap().is_correct("hello").unwrap());

    assert!(registry.evict("se"));
    assert!(!registry.evict("se"));
    // Evicted clones stay usable.
    assert!(first.is_correct("world").unwrap());
    assert_eq!(registry.speller("se").unwrap_err().kind(), ErrorKind::ArchiveNotFound);
}

#[test]
fn lookup_failures() {
    let fixture = Fixture::new();
    let registry = SpellerRegistry::from_file(library(), &write_config(&fixture)).unwrap();
    assert_eq!(registry.languages(), ["se", "sma-NO", "smj"]);

    assert_eq!(registry.speller("fi").unwrap_err().kind(), ErrorKind::UnknownLanguage);
    assert_eq!(registry.speller("smj").unwrap_err().kind(), ErrorKind::ArchiveNotFound);
    // A failed open is not cached.
    assert!(!registry.evict("smj"));
}

#[test]
fn unreadable_config() {
    let fixture = Fixture::new();
    let missing = fixture.dir.path().join("none.json");
    let err = SpellerRegistry::from_file(library(), &missing).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Io { .. })));

    let bad = fixture.write("bad.json", "{ \"spellers\": [] }");
    let err = SpellerRegistry::from_file(library(), &bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("bad.json"));
}

// ── Concurrent lookups ──────────────────────────────────────────

const SLOW_OPEN: Duration = Duration::from_millis(1500);

unsafe extern "C" fn slow_zip_open(path: Slice, error: ErrorCallback) -> *mut c_void {
    thread::sleep(SLOW_OPEN);
    unsafe { divvun_mock::divvun_hfst_zip_speller_archive_open(path, error) }
}

#[test]
fn slow_open_does_not_block_other_languages() {
    let fixture = Fixture::new();
    let config = write_config(&fixture);
    let lib = library_with(|api| {
        if let Some(zip) = api.format_mut(ArchiveFormat::Zip) {
            zip.archive_open = slow_zip_open;
        }
    });
    let registry = Arc::new(SpellerRegistry::from_file(lib, &config).unwrap());

    let slow = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.speller("se").map(|s| s.is_correct("hello")))
    };
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    let sma = registry.speller("sma-NO").unwrap();
    assert!(started.elapsed() < SLOW_OPEN / 2, "lookup waited {:?}", started.elapsed());
    assert!(sma.is_correct("hello").unwrap());

    assert!(slow.join().unwrap().unwrap().unwrap());
}

#[test]
fn racing_first_lookups_share_one_entry() {
    let fixture = Fixture::new();
    let registry = Arc::new(SpellerRegistry::from_file(library(), &write_config(&fixture)).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.speller("se").unwrap().is_correct("world").unwrap())
        })
        .collect();
    for worker in workers {
        assert!(worker.join().unwrap());
    }

    assert!(registry.evict("se"));
    assert!(!registry.evict("se"));
}
