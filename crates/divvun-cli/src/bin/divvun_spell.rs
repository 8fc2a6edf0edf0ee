// divvun-spell: Check spelling of words from stdin.
//
// Reads words from stdin (one per line) and reports whether each word
// is correctly spelled:
//   C: word    (correct)
//   W: word    (wrong / misspelled)
//   S: text    (suggestion for the preceding W line, with -s)
//
// Usage:
//   divvun-spell -a ARCHIVE [-l LIB] [OPTIONS]

use std::io;

fn main() {
    divvun_cli::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if divvun_cli::wants_help(&args) {
        println!("divvun-spell: Check spelling of words from stdin.");
        println!();
        println!("Usage: divvun-spell -a ARCHIVE [-l LIB] [OPTIONS]");
        println!();
        println!("Reads words from stdin (one per line). Prints:");
        println!("  C: word    (correct)");
        println!("  W: word    (misspelled)");
        println!();
        println!("Options:");
        println!("  -a, --archive PATH      Speller archive (.zhfst or .bhfst)");
        println!("  -f, --format FORMAT     Archive flavor: zip or chunked (default: from extension)");
        println!("  -l, --lib PATH          divvunspell library or its directory");
        println!("  -s, --suggest           Also print suggestions for misspelled words");
        println!("  -n, --n-best N          Maximum number of suggestions");
        println!("  -w, --max-weight W      Drop suggestions heavier than W");
        println!("  -h, --help              Print this help");
        return;
    }

    let (common, rest) = divvun_cli::parse_common(&args).unwrap_or_else(|e| divvun_cli::fatal(&e));
    if let Some(arg) = rest.first() {
        divvun_cli::fatal(&format!("unexpected argument `{arg}`"));
    }
    let speller = divvun_cli::open_speller(&common).unwrap_or_else(|e| divvun_cli::fatal(&e));

    let mut out = io::BufWriter::new(io::stdout().lock());
    let result = divvun_cli::check_words(&speller, &common, io::stdin().lock(), &mut out);
    if let Err(e) = divvun_cli::finish(result, &mut out) {
        divvun_cli::fatal(&e);
    }
}
