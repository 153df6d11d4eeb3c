//! Answer-key marker phrases.
//!
//! Each phrase matches case-insensitively, with any run of whitespace, `_` or `-`
//! (or nothing) between its words. A match must not be glued to other letters or
//! digits on either side, so `remark scheme` does not count while
//! `9750_mark_scheme_1` does.

use std::sync::LazyLock;

use regex::Regex;

/// Word separator accepted inside a phrase.
const SEP: &str = r"[\s_\-]*";

/// Marker phrases as (label, pattern body).
const MARKERS: &[(&str, &str)] = &[
    ("mark scheme", r"mark{SEP}schemes?"),
    ("answer key", r"answer{SEP}keys?"),
    ("answer sheet", r"answer{SEP}sheets?"),
    ("suggested answers", r"suggested{SEP}answers?"),
    (
        "examiner's report",
        r"examiner(?:s|['’]s|s['’])?{SEP}reports?",
    ),
];

#[allow(clippy::expect_used)]
static MARKER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    MARKERS
        .iter()
        .map(|(label, body)| {
            let body = body.replace("{SEP}", SEP);
            let pattern = format!(r"(?i)(?:^|[^[:alnum:]]){body}(?:[^[:alnum:]]|$)");
            (
                *label,
                Regex::new(&pattern).expect("marker regex is valid"), // Static pattern, safe to panic
            )
        })
        .collect()
});

/// Returns the label of the first marker phrase found in `text`, if any.
#[must_use]
pub fn find_marker(text: &str) -> Option<&'static str> {
    MARKER_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(label, _)| *label)
}

/// Labels of every marker phrase, in lexicon order.
#[must_use]
pub fn marker_labels() -> Vec<&'static str> {
    MARKERS.iter().map(|(label, _)| *label).collect()
}
