// divvun-suggest: Generate spelling suggestions.
//
// Suggests for each WORD argument, or for each line of stdin when no words
// are given. Correctly spelled words are reported as such.
//
// Usage:
//   divvun-suggest -a ARCHIVE [-l LIB] [OPTIONS] [WORD...]

use std::io;

fn main() {
    divvun_cli::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if divvun_cli::wants_help(&args) {
        println!("divvun-suggest: Generate spelling suggestions.");
        println!();
        println!("Usage: divvun-suggest -a ARCHIVE [-l LIB] [OPTIONS] [WORD...]");
        println!();
        println!("If WORD arguments are given, suggests for each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -a, --archive PATH       Speller archive (.zhfst or .bhfst)");
        println!("  -f, --format FORMAT      Archive flavor: zip or chunked (default: from extension)");
        println!("  -l, --lib PATH           divvunspell library or its directory");
        println!("  -n, --n-best N           Maximum number of suggestions");
        println!("  -w, --max-weight W       Drop suggestions heavier than W");
        println!("  -h, --help               Print this help");
        return;
    }

    let (common, words) = divvun_cli::parse_common(&args).unwrap_or_else(|e| divvun_cli::fatal(&e));
    if let Some(flag) = words.iter().find(|w| w.starts_with('-')) {
        divvun_cli::fatal(&format!("unknown option `{flag}`"));
    }
    let speller = divvun_cli::open_speller(&common).unwrap_or_else(|e| divvun_cli::fatal(&e));

    let mut out = io::BufWriter::new(io::stdout().lock());
    let result = if words.is_empty() {
        divvun_cli::suggest_lines(&speller, &common.config, io::stdin().lock(), &mut out)
    } else {
        words
            .iter()
            .try_for_each(|word| divvun_cli::suggest_word(&speller, &common.config, word, &mut out))
    };
    if let Err(e) = divvun_cli::finish(result, &mut out) {
        divvun_cli::fatal(&e);
    }
}
