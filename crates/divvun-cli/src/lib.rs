// divvun-cli: shared utilities for CLI tools.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use divvun_speller::{Archive, ArchiveFormat, NativeLibrary, Speller, SpellerConfig, library};

/// Options shared by every tool.
#[derive(Debug, Default, PartialEq)]
pub struct CommonArgs {
    /// Native library file or the directory containing it.
    pub lib: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    /// Archive flavor; detected from the extension when omitted.
    pub format: Option<ArchiveFormat>,
    pub config: SpellerConfig,
    pub suggest: bool,
}

/// Parse the shared options out of `args`.
///
/// Accepts both `--flag VALUE` and `--flag=VALUE`. Returns the parsed options
/// and the arguments that are not shared options, in order.
pub fn parse_common(args: &[String]) -> Result<(CommonArgs, Vec<String>), String> {
    let mut common = CommonArgs::default();
    let mut remaining = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| format!("{name} requires a value")),
            }
        };

        match flag {
            "-l" | "--lib" => common.lib = Some(PathBuf::from(value("--lib")?)),
            "-a" | "--archive" => common.archive = Some(PathBuf::from(value("--archive")?)),
            "-f" | "--format" => {
                let format = value("--format")?;
                common.format = Some(format.parse().map_err(|e| format!("{e}"))?);
            }
            "-n" | "--n-best" => {
                let n = value("--n-best")?;
                let n = n
                    .parse::<usize>()
                    .map_err(|_| format!("invalid number for --n-best: {n}"))?;
                common.config = common.config.with_n_best(n);
            }
            "-w" | "--max-weight" => {
                let w = value("--max-weight")?;
                let w = w
                    .parse::<f32>()
                    .map_err(|_| format!("invalid weight for --max-weight: {w}"))?;
                common.config = common.config.with_max_weight(w);
            }
            "-s" | "--suggest" => common.suggest = true,
            _ => remaining.push(arg.clone()),
        }
    }

    Ok((common, remaining))
}

/// Install the stderr log subscriber. Verbosity comes from `RUST_LOG`
/// (default `warn`).
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the native library, register it process-wide and open a speller for
/// the archive named in `args`.
///
/// Library search order is described in [`divvun_speller::library::search_paths`].
pub fn open_speller(args: &CommonArgs) -> Result<Speller, String> {
    let archive_path = args
        .archive
        .as_deref()
        .ok_or("no archive given (use -a PATH)")?;

    // The library is trusted to implement the divvunspell C ABI.
    let native = unsafe { NativeLibrary::discover(args.lib.as_deref()) }.map_err(|e| e.to_string())?;
    let native = library::init(native).map_err(|e| e.to_string())?;
    tracing::debug!(origin = ?native.origin(), "using native speller library");

    let archive = match args.format {
        Some(format) => Archive::open(&native, archive_path, format),
        None => Archive::open_detected(&native, archive_path),
    }
    .map_err(|e| e.to_string())?;
    archive.speller().map_err(|e| e.to_string())
}

/// Suggestions for `word`, through the configurable entry point only when a
/// limit was asked for.
pub fn suggestions(speller: &Speller, config: &SpellerConfig, word: &str) -> Result<Vec<String>, String> {
    let result = if *config == SpellerConfig::default() {
        speller.suggest(word)
    } else {
        speller.suggest_with_config(word, config)
    };
    result.map_err(|e| e.to_string())
}

// ── Word loops ──────────────────────────────────────────────────

fn output_error(e: io::Error) -> String {
    format!("cannot write output: {e}")
}

/// Trimmed, non-empty lines of `input`.
fn words(input: impl BufRead) -> impl Iterator<Item = Result<String, String>> {
    input
        .lines()
        .map(|line| line.map(|l| l.trim().to_string()).map_err(|e| format!("error reading stdin: {e}")))
        .filter(|word| !matches!(word, Ok(w) if w.is_empty()))
}

/// Check every word of `input`, writing `C: word` or `W: word` (followed by
/// `S: suggestion` lines with `--suggest`).
///
/// Stops at the first speller or write error.
pub fn check_words(
    speller: &Speller,
    args: &CommonArgs,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<(), String> {
    for word in words(input) {
        let word = word?;
        if speller.is_correct(&word).map_err(|e| e.to_string())? {
            writeln!(out, "C: {word}").map_err(output_error)?;
            continue;
        }
        writeln!(out, "W: {word}").map_err(output_error)?;
        if args.suggest {
            for suggestion in suggestions(speller, &args.config, &word)? {
                writeln!(out, "S: {suggestion}").map_err(output_error)?;
            }
        }
    }
    Ok(())
}

/// Report one word: `word (correct)`, or its suggestions.
pub fn suggest_word(
    speller: &Speller,
    config: &SpellerConfig,
    word: &str,
    out: &mut impl Write,
) -> Result<(), String> {
    if speller.is_correct(word).map_err(|e| e.to_string())? {
        return writeln!(out, "{word} (correct)").map_err(output_error);
    }
    let suggestions = suggestions(speller, config, word)?;
    if suggestions.is_empty() {
        return writeln!(out, "{word}: (no suggestions)").map_err(output_error);
    }
    writeln!(out, "{word}:").map_err(output_error)?;
    for s in &suggestions {
        writeln!(out, "  {s}").map_err(output_error)?;
    }
    Ok(())
}

/// [`suggest_word`] for every word of `input`.
pub fn suggest_lines(
    speller: &Speller,
    config: &SpellerConfig,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<(), String> {
    for word in words(input) {
        suggest_word(speller, config, &word?, out)?;
    }
    Ok(())
}

/// Flush `out` whatever happened, then report the loop's error, or the
/// flush's.
pub fn finish(result: Result<(), String>, out: &mut impl Write) -> Result<(), String> {
    let flushed = out.flush().map_err(output_error);
    result.and(flushed)
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_shared_options() {
        let (common, rest) = parse_common(&args(&[
            "-l", "/opt/lib", "--archive=se.zhfst", "-f", "chunked", "-n", "3", "--max-weight", "50.5",
            "-s", "word",
        ]))
        .unwrap();
        assert_eq!(common.lib, Some(PathBuf::from("/opt/lib")));
        assert_eq!(common.archive, Some(PathBuf::from("se.zhfst")));
        assert_eq!(common.format, Some(ArchiveFormat::Chunked));
        assert_eq!(common.config.n_best, Some(3));
        assert_eq!(common.config.max_weight, Some(50.5));
        assert!(common.suggest);
        assert_eq!(rest, ["word"]);
    }

    #[test]
    fn unknown_arguments_pass_through() {
        let (common, rest) = parse_common(&args(&["--ignore-dot", "hello", "--x=1"])).unwrap();
        assert_eq!(common, CommonArgs::default());
        assert_eq!(rest, ["--ignore-dot", "hello", "--x=1"]);
    }

    #[test]
    fn missing_value() {
        let err = parse_common(&args(&["-a"])).unwrap_err();
        assert_eq!(err, "--archive requires a value");
    }

    #[test]
    fn bad_values() {
        assert!(parse_common(&args(&["-n", "many"])).unwrap_err().contains("--n-best"));
        assert!(parse_common(&args(&["-w", "heavy"])).unwrap_err().contains("--max-weight"));
        assert!(parse_common(&args(&["--format=tar"])).unwrap_err().contains("tar"));
    }

    #[test]
    fn open_without_archive() {
        let err = open_speller(&CommonArgs::default()).unwrap_err();
        assert!(err.contains("-a PATH"));
    }

    // ── Word loops ──

    const ARCHIVE: &str = "!divvun-mock zip\nhello\nhelo -> hello, halo\n!fail boom\n";

    fn speller(dir: &tempfile::TempDir) -> Speller {
        let path = dir.path().join("se.zhfst");
        std::fs::write(&path, ARCHIVE).unwrap();
        let native = NativeLibrary::from_api(divvun_mock::api());
        Archive::open(&native, &path, ArchiveFormat::Zip)
            .unwrap()
            .speller()
            .unwrap()
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn check_words_output() {
        let dir = tempfile::tempdir().unwrap();
        let speller = speller(&dir);
        let common = CommonArgs {
            suggest: true,
            ..CommonArgs::default()
        };
        let mut out = Vec::new();
        check_words(&speller, &common, &b"hello\n\n  helo  \n"[..], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "C: hello\nW: helo\nS: hello\nS: halo\n"
        );
    }

    #[test]
    fn lines_before_a_failure_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let speller = speller(&dir);
        let mut out = io::BufWriter::new(Vec::new());
        let result = check_words(
            &speller,
            &CommonArgs::default(),
            &b"hello\nhello\nboom\nhello\n"[..],
            &mut out,
        );
        let err = finish(result, &mut out).unwrap_err();
        assert!(err.contains("boom"), "{err}");
        assert_eq!(out.get_ref().as_slice(), b"C: hello\nC: hello\n");
    }

    #[test]
    fn write_failure_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let speller = speller(&dir);
        // `boom` would fail the speller; the write error comes first.
        let err = check_words(&speller, &CommonArgs::default(), &b"hello\nboom\n"[..], &mut BrokenPipe)
            .unwrap_err();
        assert!(err.starts_with("cannot write output"), "{err}");

        let err = suggest_lines(&speller, &SpellerConfig::default(), &b"helo\nboom\n"[..], &mut BrokenPipe)
            .unwrap_err();
        assert!(err.starts_with("cannot write output"), "{err}");
    }

    #[test]
    fn suggest_word_output() {
        let dir = tempfile::tempdir().unwrap();
        let speller = speller(&dir);
        let mut out = Vec::new();
        suggest_lines(&speller, &SpellerConfig::default(), &b"hello\nhelo\nxyz\n"[..], &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "hello (correct)\nhelo:\n  hello\n  halo\nxyz: (no suggestions)\n"
        );
    }

    #[test]
    fn finish_reports_flush_failure() {
        let err = finish(Ok(()), &mut BrokenPipe).unwrap_err();
        assert!(err.starts_with("cannot write output"));
        assert_eq!(finish(Err("first".into()), &mut BrokenPipe).unwrap_err(), "first");
    }

    #[test]
    fn help_flag() {
        assert!(wants_help(&args(&["x", "-h"])));
        assert!(!wants_help(&args(&["x"])));
    }
}
