// Mock archive format: a plain-text word list.
//
//   !divvun-mock zip          header, names the archive flavor
//   hello                     a correct word
//   helo -> hello, halo/2.5   a misspelling and its ranked suggestions
//   !fail boom                queries for `boom` report an error
//
// Blank lines and lines starting with `#` are ignored. A suggestion may carry
// a `/weight` suffix (default 0). An empty suggestion is kept as-is so tests
// can provoke holes in a suggestion vector.

use std::path::Path;

use divvun_abi::ArchiveFormat;
use hashbrown::{HashMap, HashSet};

const HEADER: &str = "!divvun-mock";

/// Failure to read a mock archive.
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("cannot read archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a speller archive: missing `!divvun-mock` header")]
    MissingHeader,
    #[error("not a speller archive: {0}")]
    UnknownFormat(#[from] divvun_abi::surface::UnknownFormat),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// A suggestion with its weight; lower is better.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub word: String,
    pub weight: f32,
}

/// Parsed contents of a mock archive.
#[derive(Debug, Default)]
pub struct Lexicon {
    pub format: Option<ArchiveFormat>,
    words: HashSet<String>,
    suggestions: HashMap<String, Vec<Candidate>>,
    failing: HashSet<String>,
}

impl Lexicon {
    pub fn from_file(path: &Path) -> Result<Self, LexiconError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LexiconError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let (_, header) = lines.next().ok_or(LexiconError::MissingHeader)?;
        let format = header
            .strip_prefix(HEADER)
            .ok_or(LexiconError::MissingHeader)?
            .trim()
            .parse::<ArchiveFormat>()?;

        let mut lexicon = Lexicon {
            format: Some(format),
            ..Default::default()
        };

        for (line, content) in lines {
            if let Some(word) = content.strip_prefix("!fail") {
                let word = word.trim();
                if word.is_empty() {
                    return Err(LexiconError::Syntax {
                        line,
                        message: "`!fail` needs a word".into(),
                    });
                }
                lexicon.failing.insert(word.to_string());
            } else if let Some((typo, list)) = content.split_once("->") {
                let candidates = list
                    .split(',')
                    .map(|c| parse_candidate(c.trim(), line))
                    .collect::<Result<Vec<_>, _>>()?;
                lexicon
                    .suggestions
                    .insert(typo.trim().to_string(), candidates);
            } else {
                lexicon.words.insert(content.to_string());
            }
        }

        Ok(lexicon)
    }

    /// Whether the archive holds anything a speller can be built from.
    pub fn has_speller(&self) -> bool {
        !self.words.is_empty() || !self.suggestions.is_empty()
    }

    pub fn is_correct(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn fails_on(&self, word: &str) -> bool {
        self.failing.contains(word)
    }

    /// Ranked suggestions, filtered by weight and truncated to `n_best`.
    pub fn suggest(&self, word: &str, n_best: Option<usize>, max_weight: Option<f32>) -> Vec<String> {
        let Some(candidates) = self.suggestions.get(word) else {
            return Vec::new();
        };
        candidates
            .iter()
            .filter(|c| max_weight.is_none_or(|max| c.weight <= max))
            .take(n_best.unwrap_or(usize::MAX))
            .map(|c| c.word.clone())
            .collect()
    }
}

fn parse_candidate(text: &str, line: usize) -> Result<Candidate, LexiconError> {
    match text.rsplit_once('/') {
        Some((word, weight)) => {
            let weight = weight.trim().parse::<f32>().map_err(|e| LexiconError::Syntax {
                line,
                message: format!("bad weight `{weight}`: {e}"),
            })?;
            Ok(Candidate {
                word: word.trim().to_string(),
                weight,
            })
        }
        None => Ok(Candidate {
            word: text.to_string(),
            weight: 0.0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# greeting dictionary
!divvun-mock zip
hello
world

helo -> hello, halo/2.5, hullo/9
!fail boom
";

    #[test]
    fn parse_sample() {
        let lex = Lexicon::parse(SAMPLE).unwrap();
        assert_eq!(lex.format, Some(ArchiveFormat::Zip));
        assert!(lex.is_correct("hello"));
        assert!(!lex.is_correct("helo"));
        assert!(lex.fails_on("boom"));
        assert_eq!(lex.suggest("helo", None, None), ["hello", "halo", "hullo"]);
    }

    #[test]
    fn suggest_limits() {
        let lex = Lexicon::parse(SAMPLE).unwrap();
        assert_eq!(lex.suggest("helo", Some(1), None), ["hello"]);
        assert_eq!(lex.suggest("helo", None, Some(3.0)), ["hello", "halo"]);
        assert!(lex.suggest("zzz", None, None).is_empty());
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            Lexicon::parse("hello\n"),
            Err(LexiconError::MissingHeader)
        ));
        assert!(matches!(Lexicon::parse(""), Err(LexiconError::MissingHeader)));
    }

    #[test]
    fn unknown_flavor() {
        assert!(matches!(
            Lexicon::parse("!divvun-mock tar\nhello\n"),
            Err(LexiconError::UnknownFormat(_))
        ));
    }

    #[test]
    fn bad_weight() {
        let err = Lexicon::parse("!divvun-mock zip\nx -> y/abc\n").unwrap_err();
        assert!(matches!(err, LexiconError::Syntax { line: 2, .. }));
    }

    #[test]
    fn header_only_has_no_speller() {
        let lex = Lexicon::parse("!divvun-mock chunked\n").unwrap();
        assert!(!lex.has_speller());
    }

    #[test]
    fn empty_candidate_is_kept() {
        let lex = Lexicon::parse("!divvun-mock zip\ngap -> one, , three\n").unwrap();
        assert_eq!(lex.suggest("gap", None, None), ["one", "", "three"]);
    }
}
