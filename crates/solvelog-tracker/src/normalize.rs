//! Identifier normalization per platform.
//!
//! The only producer of `problem_id` values that reach the store. AtCoder
//! accepts a task URL and keeps it for display; Paiza accepts a bare rank
//! code and keeps no URL. Anything else is invalid, and callers turn that
//! into a user-facing validation error.

use std::sync::LazyLock;

use regex::Regex;

use solvelog_types::Platform;

/// e.g. https://atcoder.jp/contests/abc123/tasks/abc123_a
static ATCODER_TASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"atcoder\.jp/contests/[^/]+/tasks/([^/]+)").unwrap());

/// Rank letter (S/A/B/C/D) followed by exactly three digits, e.g. C012
static PAIZA_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)([sabcd])(\d{3})$").unwrap());

/// A validated, canonical problem identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedId {
    pub problem_id: String,
    /// Original URL, retained only for URL-backed platforms.
    pub url: Option<String>,
}

/// Normalize raw user input for a platform. Pure; returns `None` when the
/// input does not match the platform's accepted shape.
pub fn normalize(platform: Platform, raw: &str) -> Option<NormalizedId> {
    match platform {
        Platform::AtCoder => {
            let caps = ATCODER_TASK.captures(raw)?;
            Some(NormalizedId {
                // Task segment verbatim, case preserved
                problem_id: caps[1].to_string(),
                url: Some(raw.trim().to_string()),
            })
        }
        Platform::Paiza => {
            let caps = PAIZA_CODE.captures(raw.trim())?;
            Some(NormalizedId {
                problem_id: format!("{}{}", caps[1].to_ascii_uppercase(), &caps[2]),
                url: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atcoder_url_extracts_task_segment() {
        let n = normalize(
            Platform::AtCoder,
            "https://atcoder.jp/contests/abc123/tasks/abc123_a",
        )
        .unwrap();
        assert_eq!(n.problem_id, "abc123_a");
        assert_eq!(
            n.url.as_deref(),
            Some("https://atcoder.jp/contests/abc123/tasks/abc123_a")
        );
    }

    #[test]
    fn test_atcoder_case_preserved() {
        let n = normalize(
            Platform::AtCoder,
            "https://atcoder.jp/contests/AGC001/tasks/AGC001_F",
        )
        .unwrap();
        assert_eq!(n.problem_id, "AGC001_F");
    }

    #[test]
    fn test_atcoder_renormalizing_own_url_is_idempotent() {
        let first = normalize(
            Platform::AtCoder,
            "https://atcoder.jp/contests/abc350/tasks/abc350_d",
        )
        .unwrap();
        let second = normalize(Platform::AtCoder, first.url.as_deref().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_atcoder_rejects_non_task_urls() {
        for bad in [
            "https://atcoder.jp/contests/abc123",
            "https://atcoder.jp/contests/abc123/submissions/123",
            "https://example.com/contests/abc123/tasks/abc123_a",
            "abc123_a",
            "",
        ] {
            assert!(normalize(Platform::AtCoder, bad).is_none(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_paiza_code_uppercased() {
        for (input, expected) in [("C012", "C012"), ("s123", "S123"), ("d001", "D001")] {
            let n = normalize(Platform::Paiza, input).unwrap();
            assert_eq!(n.problem_id, expected);
            assert!(n.url.is_none());
        }
    }

    #[test]
    fn test_paiza_rejects_malformed_codes() {
        for bad in ["E012", "C12", "C0123", "012C", "C 012", "", "S12a", "SS123"] {
            assert!(normalize(Platform::Paiza, bad).is_none(), "accepted {bad:?}");
        }
    }
}
