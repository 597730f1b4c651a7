//! Parsing of `vote_params.txt`, the plain-text ballot definition file.
//!
//! The file's only structural requirement is a `Candidates:` marker; every
//! non-blank line after it is a candidate name.

use std::path::Path;

use tokio::fs;

#[derive(Debug)]
pub enum CandidatesError {
    Read(std::io::Error),
    MissingMarker,
}

impl std::fmt::Display for CandidatesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidatesError::Read(err) => write!(f, "failed to read vote_params.txt: {err}"),
            CandidatesError::MissingMarker => {
                write!(f, "vote_params.txt is missing the 'Candidates:' marker")
            }
        }
    }
}

impl std::error::Error for CandidatesError {}

/// Reads `path` and returns the list of candidate names following the
/// `Candidates:` marker, in file order, blank lines dropped.
pub async fn load_candidates(path: &Path) -> Result<Vec<String>, CandidatesError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(CandidatesError::Read)?;
    parse_candidates(&text)
}

fn parse_candidates(text: &str) -> Result<Vec<String>, CandidatesError> {
    let after_marker = text
        .split_once("Candidates:")
        .map(|(_, rest)| rest)
        .ok_or(CandidatesError::MissingMarker)?;
    Ok(after_marker
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_candidates_after_the_marker() {
        let text = "Election 2026\nCandidates:\nAlice\nBob\nCarol\n";
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let text = "Candidates:\nAlice\n\nBob\n\n";
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates, vec!["Alice", "Bob"]);
    }

    #[test]
    fn missing_marker_is_an_error() {
        let text = "Alice\nBob\n";
        assert!(matches!(
            parse_candidates(text),
            Err(CandidatesError::MissingMarker)
        ));
    }
}
