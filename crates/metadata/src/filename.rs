use std::path::Path;

use chrono::NaiveDate;
use filestore_protocol::CustomMetadata;

/// Leading-word prefixes mapped to a document type.
const DOCUMENT_TYPES: &[(&[&str], &str)] = &[
    (&["invoice", "receipt", "bill"], "invoice"),
    (&["report", "summary"], "report"),
    (&["contract", "agreement"], "contract"),
    (&["proposal"], "proposal"),
    (&["meeting", "minutes"], "meeting_notes"),
    (&["presentation", "slides"], "presentation"),
];

/// Parses structured hints out of a file name, e.g.
/// `Report_2024_Q1_v2.1.pdf` yields year, quarter, version and type.
///
/// The stem is split into words on `_`, `-` and whitespace. Only the first
/// match of each kind is kept.
pub fn parse_filename(path: &Path) -> Vec<CustomMetadata> {
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let words: Vec<&str> = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();

    let mut entries = Vec::new();

    if let Some(year) = words.iter().find(|w| is_year(w)) {
        entries.push(CustomMetadata::string("filename_year", *year));
    }

    if let Some(quarter) = words.iter().find(|w| is_quarter(w)) {
        entries.push(CustomMetadata::string(
            "filename_quarter",
            quarter.to_ascii_uppercase(),
        ));
    }

    if let Some(date) = find_date(&stem) {
        entries.push(CustomMetadata::string("filename_date", date));
    }

    if let Some(version) = find_version(&words) {
        entries.push(CustomMetadata::string("filename_version", version));
    }

    let lower = stem.to_ascii_lowercase();
    if let Some((_, doc_type)) = DOCUMENT_TYPES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| lower.starts_with(p)))
    {
        entries.push(CustomMetadata::string("filename_document_type", *doc_type));
    }

    entries
}

fn is_year(word: &str) -> bool {
    word.len() == 4 && word.starts_with("20") && word.bytes().all(|b| b.is_ascii_digit())
}

fn is_quarter(word: &str) -> bool {
    let b = word.as_bytes();
    b.len() == 2 && b[0].eq_ignore_ascii_case(&b'q') && (b'1'..=b'4').contains(&b[1])
}

/// First valid `YYYY-MM-DD` substring of `stem`.
fn find_date(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    (0..=bytes.len() - 10).find_map(|i| {
        let candidate = stem.get(i..i + 10)?;
        let shaped = candidate.bytes().enumerate().all(|(j, b)| match j {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
        if shaped && NaiveDate::parse_from_str(candidate, "%Y-%m-%d").is_ok() {
            Some(candidate.to_string())
        } else {
            None
        }
    })
}

/// `v1.2`, `version1.2` or `version-1.2` (split into two words).
fn find_version(words: &[&str]) -> Option<String> {
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("version") {
            if is_version_number(rest) {
                return Some(rest.to_string());
            }
            if rest.is_empty() {
                if let Some(next) = words.get(i + 1).filter(|n| is_version_number(n)) {
                    return Some(next.to_string());
                }
            }
        }
    }
    words.iter().find_map(|word| {
        let rest = word.strip_prefix(['v', 'V'])?;
        is_version_number(rest).then(|| rest.to_string())
    })
}

fn is_version_number(s: &str) -> bool {
    let mut parts = s.split('.');
    let major_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    major_ok && parts.all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str) -> Vec<(String, String)> {
        parse_filename(Path::new(name))
            .into_iter()
            .map(|e| (e.key.clone(), e.as_str().unwrap_or_default().to_string()))
            .collect()
    }

    fn get(name: &str, key: &str) -> Option<String> {
        parsed(name).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn report_year_quarter() {
        let name = "Report_2024_Q1.pdf";
        assert_eq!(get(name, "filename_year").as_deref(), Some("2024"));
        assert_eq!(get(name, "filename_quarter").as_deref(), Some("Q1"));
        assert_eq!(get(name, "filename_document_type").as_deref(), Some("report"));
    }

    #[test]
    fn meeting_notes_date() {
        let name = "Meeting_Notes_2024-01-15.docx";
        assert_eq!(get(name, "filename_date").as_deref(), Some("2024-01-15"));
        assert_eq!(get(name, "filename_year").as_deref(), Some("2024"));
        assert_eq!(
            get(name, "filename_document_type").as_deref(),
            Some("meeting_notes")
        );
    }

    #[test]
    fn impossible_date_ignored() {
        assert_eq!(get("notes_2024-13-45.txt", "filename_date"), None);
    }

    #[test]
    fn versions() {
        assert_eq!(get("spec_v2.1.md", "filename_version").as_deref(), Some("2.1"));
        assert_eq!(get("spec-version-3.md", "filename_version").as_deref(), Some("3"));
        assert_eq!(get("spec_Version1.0.md", "filename_version").as_deref(), Some("1.0"));
        assert_eq!(get("vacation.txt", "filename_version"), None);
    }

    #[test]
    fn quarter_is_uppercased() {
        assert_eq!(get("sales q3 2023.csv", "filename_quarter").as_deref(), Some("Q3"));
        assert_eq!(get("q5_plan.txt", "filename_quarter"), None);
    }

    #[test]
    fn document_type_from_prefix() {
        assert_eq!(
            get("Receipt-0042.pdf", "filename_document_type").as_deref(),
            Some("invoice")
        );
        assert_eq!(
            get("slides_kickoff.pptx", "filename_document_type").as_deref(),
            Some("presentation")
        );
        assert_eq!(get("notes.txt", "filename_document_type"), None);
    }

    #[test]
    fn plain_name_yields_nothing() {
        assert!(parsed("readme.md").is_empty());
    }
}
