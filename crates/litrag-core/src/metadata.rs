//! Bibliographic metadata pulled from the leading lines of a paper.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

const TITLE_NOISE: &[&str] = &["abstract", "introduction", "doi:", "volume", "issue"];
const TITLE_LINES: usize = 20;
const AUTHOR_LINES: usize = 30;
const JOURNAL_LINES: usize = 50;
const YEAR_LINES: usize = 50;
const PREFERRED_YEARS: std::ops::RangeInclusive<u16> = 2015..=2025;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<u16>,
}

struct Patterns {
    authors: [Regex; 3],
    journal: [Regex; 2],
    year: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            authors: [
                Regex::new(r"(?i)^([A-Z][a-z]+\s+[A-Z][a-z]+(?:\s*,\s*[A-Z][a-z]+\s+[A-Z][a-z]+)+)")?,
                Regex::new(r"(?i)^([A-Z]\.\s*[A-Z][a-z]+(?:\s*,\s*[A-Z]\.\s*[A-Z][a-z]+)+)")?,
                Regex::new(r"(?i)Authors?:\s*(.+)$")?,
            ],
            journal: [
                Regex::new(r"(?:Published in|Journal[:\s]+)([A-Z][^,\n]+)")?,
                Regex::new(r"([A-Z][a-z]+\s+(?:Journal|Review|Letters|Medicine|Research|Science)[^,\n]*)")?,
            ],
            year: Regex::new(r"\b(20[0-2][0-9]|201[0-9])\b")?,
        })
    }
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::error!(error = %e, "metadata patterns failed to compile");
                None
            }
        })
        .as_ref()
}

/// Title, authors, journal and year for the document at `path`.
pub fn extract_metadata(path: &Path, text: &str) -> DocumentMetadata {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let file_name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    DocumentMetadata {
        title: extract_title(&stem, text),
        authors: extract_authors(text),
        journal: extract_journal(text),
        year: extract_year(&file_name, text),
    }
}

/// First plausible title line among the first 20 lines, else the file stem
/// with separators turned into spaces.
pub fn extract_title(file_stem: &str, text: &str) -> String {
    for line in text.lines().take(TITLE_LINES) {
        let line = line.trim();
        let len = line.chars().count();
        let starts_upper = line.chars().next().is_some_and(char::is_uppercase);
        if len > 10 && len < 200 && starts_upper {
            let lower = line.to_lowercase();
            if !TITLE_NOISE.iter().any(|noise| lower.contains(noise)) { return line.to_string(); }
        }
    }
    file_stem.replace(['_', '-'], " ").trim().to_string()
}

/// First capture of the first pattern, line by line, whose trimmed length
/// lies strictly between `min` and `max` characters.
fn first_capture(text: &str, lines: usize, regexes: &[Regex], min: usize, max: usize) -> Option<String> {
    for line in text.lines().take(lines) {
        for re in regexes {
            let Some(found) = re.captures(line).and_then(|c| c.get(1)) else { continue };
            let value = found.as_str().trim();
            let len = value.chars().count();
            if len > min && len < max { return Some(value.to_string()); }
        }
    }
    None
}

pub fn extract_authors(text: &str) -> Option<String> {
    first_capture(text, AUTHOR_LINES, &patterns()?.authors, 10, 500)
}

pub fn extract_journal(text: &str) -> Option<String> {
    first_capture(text, JOURNAL_LINES, &patterns()?.journal, 5, 200)
}

/// A year in the file name wins. Otherwise the most frequent year in the
/// first 50 lines, counting only 2015..=2025 when any appear there.
/// Equal counts resolve to the later year.
pub fn extract_year(file_name: &str, text: &str) -> Option<u16> {
    let re = &patterns()?.year;
    if let Some(found) = re.find(file_name) {
        return found.as_str().parse().ok();
    }

    let mut years: Vec<u16> = Vec::new();
    for line in text.lines().take(YEAR_LINES) {
        years.extend(re.find_iter(line).filter_map(|m| m.as_str().parse::<u16>().ok()));
    }
    if years.iter().any(|y| PREFERRED_YEARS.contains(y)) {
        years.retain(|y| PREFERRED_YEARS.contains(y));
    }
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for y in years { *counts.entry(y).or_insert(0) += 1; }
    counts.into_iter().max_by_key(|&(year, count)| (count, year)).map(|(year, _)| year)
}
