//! Shared fixtures: the in-process mock library and archives written to a
//! temporary directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use divvun_abi::surface::NativeApi;
use divvun_speller::NativeLibrary;
use tempfile::TempDir;

/// A small Northern Sami flavored word list in the zip flavor.
pub const SAMPLE: &str = "\
!divvun-mock zip
hello
world
čálli
helo -> hello, halo/2.5, hullo/9
čáli -> čálli, čállit/1.5
hole -> whole, , hold
!fail boom
";

pub fn library() -> Arc<NativeLibrary> {
    NativeLibrary::from_api(divvun_mock::api())
}

pub fn library_with(edit: impl FnOnce(&mut NativeApi)) -> Arc<NativeLibrary> {
    let mut api = divvun_mock::api();
    edit(&mut api);
    NativeLibrary::from_api(api)
}

/// Archives written into a directory that is removed on drop.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// `SAMPLE` as `se.zhfst`.
    pub fn sample(&self) -> PathBuf {
        self.write("se.zhfst", SAMPLE)
    }

    /// `SAMPLE` in the chunked flavor, as `se.bhfst`.
    pub fn sample_chunked(&self) -> PathBuf {
        self.write(
            "se.bhfst",
            &SAMPLE.replacen("!divvun-mock zip", "!divvun-mock chunked", 1),
        )
    }
}
